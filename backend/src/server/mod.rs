//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::AppSettings;

use std::io;
use std::path::Path;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, HttpServer, web};
use tracing::{info, warn};
use utoipa::OpenApi;

use canary_backend::ApiDoc;
use canary_backend::inbound::http::{Trace, configure_api};
use canary_backend::inbound::http::health::{HealthState, live, ready};
use canary_backend::inbound::http::state::HttpState;
use canary_backend::outbound::queue::spawn_fanout_worker;

use state_builders::{Components, build_components};

const SESSION_KEY_MIN_LEN: usize = 64;
/// Room for request framing on top of the largest accepted upload.
const PAYLOAD_SLACK_BYTES: usize = 64 * 1024;

/// Load the cookie signing key shared with the identity service.
fn load_session_key(path: &Path, allow_ephemeral: bool) -> io::Result<Key> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.len() >= SESSION_KEY_MIN_LEN => Ok(Key::derive_from(&bytes)),
        Ok(bytes) => Err(io::Error::other(format!(
            "session key at {} is {} bytes; at least {SESSION_KEY_MIN_LEN} required",
            path.display(),
            bytes.len()
        ))),
        Err(error) if allow_ephemeral || cfg!(debug_assertions) => {
            warn!(path = %path.display(), %error, "using temporary session key (dev only)");
            Ok(Key::generate())
        }
        Err(error) => Err(io::Error::other(format!(
            "failed to read session key at {}: {error}",
            path.display()
        ))),
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    payload_limit: usize,
}

async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        payload_limit,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1").wrap(session).configure(configure_api);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::PayloadConfig::new(payload_limit))
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live)
        .route("/api-docs/openapi.json", web::get().to(openapi_json))
}

/// Wire adapters, start background work, and serve HTTP until shutdown.
///
/// # Errors
///
/// Returns [`io::Error`] when configuration is invalid, storage cannot be
/// reached, or the socket cannot be bound.
pub async fn run(settings: AppSettings) -> io::Result<()> {
    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;
    let key = load_session_key(&settings.session_key_file(), settings.session_allow_ephemeral)?;
    let cookie_secure = settings.cookie_secure();
    let largest_upload = settings
        .document_max_bytes()
        .map_err(io::Error::other)?
        .max(settings.logo_max_bytes().map_err(io::Error::other)?);
    let payload_limit = usize::try_from(largest_upload)
        .unwrap_or(usize::MAX)
        .saturating_add(PAYLOAD_SLACK_BYTES);

    let Components {
        http_state,
        dispatcher,
        receiver,
        scheduler,
    } = build_components(&settings).await?;

    let worker = spawn_fanout_worker(receiver, dispatcher);
    let scheduler = scheduler.start();

    let health_state = web::Data::new(HealthState::new());
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state: web::Data::new(http_state),
        key,
        cookie_secure,
        payload_limit,
    };
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(bind_addr)?
        .run();

    health_state.mark_ready();
    info!(%bind_addr, "canary backend listening");
    let result = server.await;

    health_state.mark_unhealthy();
    scheduler.shutdown().await;
    // Events still queued at shutdown are dropped.
    worker.abort();
    result
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use std::io::Write;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn short_session_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[7_u8; 16]).expect("write key");
        let Err(err) = load_session_key(file.path(), true) else {
            panic!("short key accepted");
        };
        assert!(err.to_string().contains("at least 64"));
    }

    #[rstest]
    fn long_session_key_is_accepted() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[7_u8; 64]).expect("write key");
        assert!(load_session_key(file.path(), false).is_ok());
    }

    #[rstest]
    fn missing_key_falls_back_when_allowed() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(load_session_key(&dir.path().join("absent"), true).is_ok());
    }
}
