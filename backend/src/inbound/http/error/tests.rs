//! Tests for HTTP error mapping.

use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::CanaryError;

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::precondition_failed("unverified"), StatusCode::PRECONDITION_FAILED)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

#[rstest]
#[case(CanaryError::WarrantNotFound, StatusCode::NOT_FOUND)]
#[case(CanaryError::DomainNotVerified, StatusCode::PRECONDITION_FAILED)]
#[case(CanaryError::DocumentLimitExceeded { max: 5 }, StatusCode::PRECONDITION_FAILED)]
#[case(CanaryError::validation("hash too long"), StatusCode::BAD_REQUEST)]
fn canary_errors_reach_expected_status(#[case] error: CanaryError, #[case] status: StatusCode) {
    let error = Error::from(error);
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn body_of(error: &Error) -> Error {
    let response = ResponseError::error_response(error);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted() {
    let error = Error::internal("connection string postgres://secret").with_details(json!({"secret": "x"}));
    let body = body_of(&error).await;
    assert_eq!(body.code(), ErrorCode::InternalError);
    assert_eq!(body.message(), "Internal server error");
    assert!(body.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_details() {
    let error = Error::from(CanaryError::DomainNotVerified);
    let body = body_of(&error).await;
    assert_eq!(body.code(), ErrorCode::PreconditionFailed);
    assert_eq!(body.details(), Some(&json!({"code": "domain_not_verified"})));
}
