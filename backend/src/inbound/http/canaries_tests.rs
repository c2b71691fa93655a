//! Handler tests for canary endpoints.

use actix_web::http::StatusCode;
use actix_web::test;
use rstest::rstest;
use serde_json::{Value, json};

use crate::domain::{CanaryError, PublicCanary, UserId};
use crate::inbound::http::test_utils::{CALLER, MockPorts, session_cookie, test_app};
use crate::test_support::sample_canary;

fn caller() -> UserId {
    UserId::new(CALLER).expect("fixture id")
}

macro_rules! login {
    ($app:expr) => {{
        let res = test::call_service(
            &$app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/login/{CALLER}"))
                .to_request(),
        )
        .await;
        session_cookie(&res)
    }};
}

#[rstest]
#[actix_web::test]
async fn create_canary_returns_owner_view() {
    let mut ports = MockPorts::default();
    ports
        .canaries
        .expect_create_canary()
        .withf(|request| {
            request.domain.as_str() == "example.org"
                && request.profile.name == "Example"
                && request.caller == caller()
        })
        .times(1)
        .returning(|request| {
            Ok(sample_canary(&request.caller, request.domain.as_str(), false))
        });
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/create")
            .cookie(cookie)
            .set_json(json!({"domain": " Example.ORG ", "name": "Example", "about": "Reports"}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["domain"], "example.org");
    assert_eq!(body["verified"], false);
    assert!(body["challenge"].as_str().is_some_and(|code| !code.is_empty()));
}

#[rstest]
#[actix_web::test]
async fn create_canary_requires_login() {
    let app = test::init_service(test_app(MockPorts::default().into_state())).await;
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/create")
            .set_json(json!({"domain": "example.org", "name": "Example"}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn taken_domain_is_precondition_failed() {
    let mut ports = MockPorts::default();
    ports
        .canaries
        .expect_create_canary()
        .returning(|_| Err(CanaryError::CanaryTaken));
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/create")
            .cookie(cookie)
            .set_json(json!({"domain": "example.org", "name": "Example"}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["details"]["code"], "canary_taken");
}

#[rstest]
#[actix_web::test]
async fn static_routes_win_over_domain_lookup() {
    let mut ports = MockPorts::default();
    ports
        .canary_query
        .expect_list_trusted()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    ports.canary_query.expect_get_canary().never();
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/canary/trusted/list")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn public_view_is_anonymous_and_hides_challenge() {
    let mut ports = MockPorts::default();
    ports
        .canary_query
        .expect_get_public_canary()
        .withf(|domain| domain.as_str() == "example.org")
        .returning(|domain| {
            Ok(PublicCanary::from(sample_canary(&caller(), domain.as_str(), true)))
        });
    let app = test::init_service(test_app(ports.into_state())).await;

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/canary/example.org/public")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["verified"], true);
    assert!(body.get("challenge").is_none());
}

#[rstest]
#[actix_web::test]
async fn delete_requires_otp() {
    let mut ports = MockPorts::default();
    ports.canaries.expect_delete_canary().never();
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/api/v1/canary/example.org/delete")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn delete_passes_otp_through() {
    let mut ports = MockPorts::default();
    ports
        .canaries
        .expect_delete_canary()
        .withf(|domain, _, otp| domain.as_str() == "example.org" && otp == "123456")
        .times(1)
        .returning(|_, _, _| Ok(()));
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/api/v1/canary/example.org/delete?otp=123456")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[rstest]
#[actix_web::test]
async fn trust_requires_key_hash() {
    let mut ports = MockPorts::default();
    ports.canaries.expect_trust_canary().never();
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/example.org/trusted/add")
            .cookie(cookie)
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn failed_verification_is_precondition_failed() {
    let mut ports = MockPorts::default();
    ports
        .canaries
        .expect_verify_canary()
        .returning(|_, _| Err(CanaryError::DomainVerificationFailed));
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/example.org/verify")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED);
}

#[rstest]
#[actix_web::test]
async fn update_logo_passes_raw_body_and_filename() {
    let mut ports = MockPorts::default();
    ports
        .canaries
        .expect_update_logo()
        .withf(|domain, who, upload| {
            domain.as_str() == "example.org"
                && *who == caller()
                && upload.filename == "logo.png"
                && upload.content == b"PNGDATA"
        })
        .times(1)
        .returning(|domain, who, _| {
            let mut canary = sample_canary(who, domain.as_str(), true);
            canary.logo = Some("0f1e2d.png".to_owned());
            Ok(canary)
        });
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/example.org/logo/update?filename=logo.png")
            .cookie(cookie)
            .set_payload("PNGDATA")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["logo"], "0f1e2d.png");
}

#[rstest]
#[case("/api/v1/canary/example.org/logo/update", "PNGDATA")]
#[case("/api/v1/canary/example.org/logo/update?filename=logo.png", "")]
#[actix_web::test]
async fn update_logo_rejects_incomplete_uploads(#[case] uri: &str, #[case] body: &'static str) {
    let mut ports = MockPorts::default();
    ports.canaries.expect_update_logo().never();
    let app = test::init_service(test_app(ports.into_state())).await;
    let cookie = login!(app);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(uri)
            .cookie(cookie)
            .set_payload(body)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn update_logo_requires_session() {
    let mut ports = MockPorts::default();
    ports.canaries.expect_update_logo().never();
    let app = test::init_service(test_app(ports.into_state())).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/canary/example.org/logo/update?filename=logo.png")
            .set_payload("PNGDATA")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
