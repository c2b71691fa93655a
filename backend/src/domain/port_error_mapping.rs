//! Projection of driven-port failures onto [`CanaryError`].
//!
//! Connection failures surface as `Unavailable`, everything else the caller
//! cannot act on surfaces as `Internal`.

use crate::domain::CanaryError;
use crate::domain::ports::{
    CanaryRepositoryError, DocumentStorageError, DomainVerifierError, OneTimePasswordError,
    SubscriptionRepositoryError, TrustedCanaryRepositoryError, WarrantRepositoryError,
};

pub(crate) fn map_warrant_error(error: WarrantRepositoryError) -> CanaryError {
    match error {
        WarrantRepositoryError::Connection { message } => {
            CanaryError::unavailable(format!("warrant repository unavailable: {message}"))
        }
        WarrantRepositoryError::Query { message } => {
            CanaryError::internal(format!("warrant repository error: {message}"))
        }
    }
}

pub(crate) fn map_canary_error(error: CanaryRepositoryError) -> CanaryError {
    match error {
        CanaryRepositoryError::Connection { message } => {
            CanaryError::unavailable(format!("canary repository unavailable: {message}"))
        }
        CanaryRepositoryError::Query { message } => {
            CanaryError::internal(format!("canary repository error: {message}"))
        }
        CanaryRepositoryError::Duplicate => CanaryError::CanaryTaken,
    }
}

pub(crate) fn map_subscription_error(error: SubscriptionRepositoryError) -> CanaryError {
    match error {
        SubscriptionRepositoryError::Connection { message } => {
            CanaryError::unavailable(format!("subscription repository unavailable: {message}"))
        }
        SubscriptionRepositoryError::Query { message } => {
            CanaryError::internal(format!("subscription repository error: {message}"))
        }
    }
}

pub(crate) fn map_trusted_error(error: TrustedCanaryRepositoryError) -> CanaryError {
    match error {
        TrustedCanaryRepositoryError::Connection { message } => {
            CanaryError::unavailable(format!("trusted canary repository unavailable: {message}"))
        }
        TrustedCanaryRepositoryError::Query { message } => {
            CanaryError::internal(format!("trusted canary repository error: {message}"))
        }
    }
}

pub(crate) fn map_otp_error(error: OneTimePasswordError) -> CanaryError {
    match error {
        OneTimePasswordError::Invalid => CanaryError::AuthFactorInvalid,
        OneTimePasswordError::Unavailable { message } => {
            CanaryError::unavailable(format!("one-time password validator unavailable: {message}"))
        }
    }
}

pub(crate) fn map_verifier_error(error: DomainVerifierError) -> CanaryError {
    match error {
        DomainVerifierError::Unavailable { message } => {
            CanaryError::unavailable(format!("domain verifier unavailable: {message}"))
        }
    }
}

pub(crate) fn map_storage_error(error: DocumentStorageError) -> CanaryError {
    match error {
        DocumentStorageError::TooLarge { .. } | DocumentStorageError::ExtensionNotAllowed { .. } => {
            CanaryError::validation(error.to_string())
        }
        DocumentStorageError::Backend { message } => {
            CanaryError::unavailable(format!("document storage unavailable: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;
    use crate::domain::CanaryErrorKind;

    #[rstest]
    fn connection_failures_are_unavailable() {
        let err = map_warrant_error(WarrantRepositoryError::connection("refused"));
        assert_eq!(err.kind(), CanaryErrorKind::Unavailable);
        assert!(err.to_string().contains("refused"));
    }

    #[rstest]
    fn duplicate_canary_is_taken() {
        assert_eq!(
            map_canary_error(CanaryRepositoryError::duplicate()),
            CanaryError::CanaryTaken
        );
    }

    #[rstest]
    fn rejected_otp_is_auth_factor_invalid() {
        assert_eq!(
            map_otp_error(OneTimePasswordError::invalid()),
            CanaryError::AuthFactorInvalid
        );
    }

    #[rstest]
    #[case(DocumentStorageError::too_large(10_u64), CanaryErrorKind::Validation)]
    #[case(DocumentStorageError::extension_not_allowed("exe"), CanaryErrorKind::Validation)]
    #[case(DocumentStorageError::backend("disk full"), CanaryErrorKind::Unavailable)]
    fn storage_errors_are_classified(
        #[case] error: DocumentStorageError,
        #[case] expected: CanaryErrorKind,
    ) {
        assert_eq!(map_storage_error(error).kind(), expected);
    }
}
