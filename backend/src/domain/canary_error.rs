//! Typed failures raised by the canary and warrant use-cases.
//!
//! Missing records, records owned by someone else, and records in the wrong
//! lifecycle state all collapse into the same not-found variant so callers
//! cannot discover the existence of other users' warrants.

use thiserror::Error;

/// Coarse failure taxonomy exposed at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanaryErrorKind {
    /// Missing, foreign, or wrong-state record.
    NotFound,
    /// A business precondition is not satisfied.
    PreconditionFailed,
    /// Caller input is malformed or oversized.
    Validation,
    /// A backing store or collaborator is temporarily unavailable.
    Unavailable,
    /// Unexpected failure.
    Internal,
}

/// Errors returned by canary, warrant, subscription, and trust operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanaryError {
    /// The canary does not exist or is not owned by the caller.
    #[error("canary not found")]
    CanaryNotFound,
    /// The warrant does not exist, is not owned by the caller, or is not a
    /// draft.
    #[error("warrant not found")]
    WarrantNotFound,
    /// Domain ownership has not been verified yet.
    #[error("domain verification has not been completed")]
    DomainNotVerified,
    /// DNS verification was attempted and did not succeed.
    #[error("domain verification failed")]
    DomainVerificationFailed,
    /// The one-time password was rejected.
    #[error("one-time password is invalid")]
    AuthFactorInvalid,
    /// The draft already carries the maximum number of documents.
    #[error("a warrant may hold at most {max} documents")]
    DocumentLimitExceeded {
        /// Configured cap.
        max: usize,
    },
    /// The domain is claimed by another canary or was previously deleted.
    #[error("canary domain is already taken")]
    CanaryTaken,
    /// The caller already pinned a trust anchor for this domain.
    #[error("canary is already trusted")]
    AlreadyTrusted,
    /// Input failed validation.
    #[error("invalid request: {message}")]
    Validation {
        /// Human-readable reason.
        message: String,
    },
    /// A backing service could not be reached.
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
    },
    /// Unexpected failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable reason.
        message: String,
    },
}

impl CanaryError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Build an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Project the error onto the boundary taxonomy.
    ///
    /// # Examples
    /// ```
    /// use canary_backend::domain::{CanaryError, CanaryErrorKind};
    ///
    /// assert_eq!(CanaryError::WarrantNotFound.kind(), CanaryErrorKind::NotFound);
    /// assert_eq!(
    ///     CanaryError::DomainNotVerified.kind(),
    ///     CanaryErrorKind::PreconditionFailed
    /// );
    /// ```
    pub fn kind(&self) -> CanaryErrorKind {
        match self {
            Self::CanaryNotFound | Self::WarrantNotFound => CanaryErrorKind::NotFound,
            Self::DomainNotVerified
            | Self::DomainVerificationFailed
            | Self::AuthFactorInvalid
            | Self::DocumentLimitExceeded { .. }
            | Self::CanaryTaken
            | Self::AlreadyTrusted => CanaryErrorKind::PreconditionFailed,
            Self::Validation { .. } => CanaryErrorKind::Validation,
            Self::Unavailable { .. } => CanaryErrorKind::Unavailable,
            Self::Internal { .. } => CanaryErrorKind::Internal,
        }
    }

    /// Stable machine-readable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CanaryNotFound => "canary_not_found",
            Self::WarrantNotFound => "warrant_not_found",
            Self::DomainNotVerified => "domain_not_verified",
            Self::DomainVerificationFailed => "domain_verification_failed",
            Self::AuthFactorInvalid => "auth_factor_invalid",
            Self::DocumentLimitExceeded { .. } => "document_limit_exceeded",
            Self::CanaryTaken => "canary_taken",
            Self::AlreadyTrusted => "canary_already_trusted",
            Self::Validation { .. } => "validation_error",
            Self::Unavailable { .. } => "unavailable",
            Self::Internal { .. } => "internal_error",
        }
    }
}
