//! HTTP inbound adapter exposing the canary REST API.

pub mod canaries;
pub mod error;
pub mod health;
pub mod session;
pub mod state;
pub mod subscriptions;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod trace;
pub(crate) mod validation;
pub mod warrants;

use actix_web::web;

pub use error::ApiResult;
pub use trace::Trace;

/// Register every canary endpoint on an `/api/v1` scope.
///
/// Fixed paths are registered before `/canary/{domain}` so that, for
/// example, `/canary/list` is never read as a domain lookup.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(canaries::create_canary)
        .service(canaries::list_canaries)
        .service(canaries::list_trusted)
        .service(warrants::get_published)
        .service(warrants::get_draft)
        .service(warrants::attach_document)
        .service(warrants::publish_warrant)
        .service(subscriptions::is_subscribed)
        .service(subscriptions::subscribe)
        .service(subscriptions::unsubscribe)
        .service(warrants::create_warrant)
        .service(canaries::get_trusted)
        .service(canaries::trust_canary)
        .service(canaries::verify_canary)
        .service(canaries::delete_canary)
        .service(canaries::update_logo)
        .service(canaries::get_public_canary)
        .service(canaries::get_canary);
}
