//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, web};

use crate::domain::ports::{
    MockCanaryCommand, MockCanaryQuery, MockSubscriptionCommand, MockWarrantCommand,
    MockWarrantQuery,
};
use crate::domain::{Error, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

pub(crate) const CALLER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Session middleware with a fresh key and the `Secure` flag off.
pub(crate) fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

async fn login_as(session: SessionContext, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let caller = UserId::new(path.into_inner())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_caller(&caller)?;
    Ok(HttpResponse::Ok().finish())
}

/// Extract the session cookie from a login response.
pub(crate) fn session_cookie(response: &ServiceResponse) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Driving-port mocks; tests set expectations before calling [`MockPorts::into_state`].
#[derive(Default)]
pub(crate) struct MockPorts {
    pub warrants: MockWarrantCommand,
    pub warrant_query: MockWarrantQuery,
    pub canaries: MockCanaryCommand,
    pub canary_query: MockCanaryQuery,
    pub subscriptions: MockSubscriptionCommand,
}

impl MockPorts {
    pub(crate) fn into_state(self) -> HttpState {
        HttpState {
            warrants: Arc::new(self.warrants),
            warrant_query: Arc::new(self.warrant_query),
            canaries: Arc::new(self.canaries),
            canary_query: Arc::new(self.canary_query),
            subscriptions: Arc::new(self.subscriptions),
        }
    }
}

/// App with the canary API under `/api/v1` and a `POST /api/v1/login/{id}` helper.
pub(crate) fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api/v1")
            .wrap(test_session_middleware())
            .route("/login/{id}", web::post().to(login_as))
            .configure(crate::inbound::http::configure_api),
    )
}
