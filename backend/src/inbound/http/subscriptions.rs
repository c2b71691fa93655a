//! Subscription HTTP handlers.
//!
//! ```text
//! GET    /api/v1/canary/subscription/{id}
//! POST   /api/v1/canary/subscription/{id}/subscribe
//! DELETE /api/v1/canary/subscription/{id}/unsubscribe
//! ```
//!
//! A malformed canary id is never an error here: the check reports `false`
//! and the mutations succeed without doing anything.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_subscription_canary_id;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscribed: bool,
}

/// Whether the caller follows a canary.
#[utoipa::path(
    get,
    path = "/api/v1/canary/subscription/{id}",
    params(("id" = String, Path, description = "Canary id")),
    responses(
        (status = 200, description = "Subscription state", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["subscriptions"],
    operation_id = "isSubscribed"
)]
#[get("/canary/subscription/{id}")]
pub async fn is_subscribed(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let caller = session.require_caller()?;
    let subscribed = match parse_subscription_canary_id(&path.into_inner()) {
        Some(canary_id) => state.subscriptions.is_subscribed(&canary_id, &caller).await?,
        None => false,
    };
    Ok(web::Json(SubscriptionResponse { subscribed }))
}

/// Follow a canary.
#[utoipa::path(
    post,
    path = "/api/v1/canary/subscription/{id}/subscribe",
    params(("id" = String, Path, description = "Canary id")),
    responses(
        (status = 204, description = "Subscribed"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error)
    ),
    tags = ["subscriptions"],
    operation_id = "subscribe"
)]
#[post("/canary/subscription/{id}/subscribe")]
pub async fn subscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    if let Some(canary_id) = parse_subscription_canary_id(&path.into_inner()) {
        state.subscriptions.subscribe(&canary_id, &caller).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Stop following a canary.
#[utoipa::path(
    delete,
    path = "/api/v1/canary/subscription/{id}/unsubscribe",
    params(("id" = String, Path, description = "Canary id")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["subscriptions"],
    operation_id = "unsubscribe"
)]
#[delete("/canary/subscription/{id}/unsubscribe")]
pub async fn unsubscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    if let Some(canary_id) = parse_subscription_canary_id(&path.into_inner()) {
        state.subscriptions.unsubscribe(&canary_id, &caller).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::Value;

    use crate::domain::CanaryId;
    use crate::inbound::http::test_utils::{CALLER, MockPorts, session_cookie, test_app};

    #[rstest]
    #[actix_web::test]
    async fn malformed_ids_short_circuit() {
        let mut ports = MockPorts::default();
        ports.subscriptions.expect_is_subscribed().never();
        ports.subscriptions.expect_subscribe().never();
        ports.subscriptions.expect_unsubscribe().never();
        let app = test::init_service(test_app(ports.into_state())).await;
        let login = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/login/{CALLER}"))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&login);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/canary/subscription/garbage")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["subscribed"], false);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/canary/subscription/garbage/subscribe")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/api/v1/canary/subscription/garbage/unsubscribe")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[actix_web::test]
    async fn subscribe_reaches_the_port() {
        let canary_id = CanaryId::random();
        let mut ports = MockPorts::default();
        ports
            .subscriptions
            .expect_subscribe()
            .withf(move |id, _| *id == canary_id)
            .times(1)
            .returning(|_, _| Ok(()));
        ports
            .subscriptions
            .expect_is_subscribed()
            .returning(|_, _| Ok(true));
        let app = test::init_service(test_app(ports.into_state())).await;
        let login = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/login/{CALLER}"))
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&login);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/canary/subscription/{canary_id}/subscribe"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/canary/subscription/{canary_id}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["subscribed"], true);
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_subscribe_is_unauthorised() {
        let app = test::init_service(test_app(MockPorts::default().into_state())).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/canary/subscription/{}/subscribe", CanaryId::random()))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
