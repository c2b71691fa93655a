//! Tests for the error payload formatting and canary error mapping.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_substitutes_blank_messages() {
    let err = Error::new(ErrorCode::InternalError, "");
    assert_eq!(err.message(), "unspecified error");
}

#[rstest]
fn serialises_in_camel_case_without_empty_details() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise error");
    assert_eq!(value, json!({ "code": "not_found", "message": "missing" }));
}

#[rstest]
fn deserialisation_rejects_blank_messages() {
    let result = serde_json::from_value::<Error>(json!({ "code": "not_found", "message": " " }));
    assert!(result.is_err());
}

#[rstest]
#[case(CanaryError::WarrantNotFound, ErrorCode::NotFound, "warrant_not_found")]
#[case(CanaryError::DomainNotVerified, ErrorCode::PreconditionFailed, "domain_not_verified")]
#[case(CanaryError::AuthFactorInvalid, ErrorCode::PreconditionFailed, "auth_factor_invalid")]
#[case(
    CanaryError::DocumentLimitExceeded { max: 3 },
    ErrorCode::PreconditionFailed,
    "document_limit_exceeded"
)]
#[case(CanaryError::validation("bad hash"), ErrorCode::InvalidRequest, "validation_error")]
#[case(CanaryError::unavailable("pool"), ErrorCode::ServiceUnavailable, "unavailable")]
fn canary_errors_map_to_stable_codes(
    #[case] error: CanaryError,
    #[case] expected_code: ErrorCode,
    #[case] expected_reason: &str,
) {
    let mapped = Error::from(error);
    assert_eq!(mapped.code(), expected_code);
    assert_eq!(mapped.details(), Some(&json!({ "code": expected_reason })));
}
