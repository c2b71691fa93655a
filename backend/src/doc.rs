//! OpenAPI documentation for the canary REST API.
//!
//! Served as JSON at `/api-docs/openapi.json`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::canaries::{
    CanaryResponse, CreateCanaryBody, PublicCanaryResponse, TrustCanaryBody,
    TrustedCanaryResponse,
};
use crate::inbound::http::subscriptions::SubscriptionResponse;
use crate::inbound::http::warrants::{
    CreateWarrantBody, DocumentResponse, PublishWarrantBody, PublishedWarrantResponse,
    StatementResponse, WarrantResponse,
};

/// Adds the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie shared with the identity service.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Warrant canary API",
        description = "Canary registration, warrant lifecycle, subscriptions, and health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::canaries::create_canary,
        crate::inbound::http::canaries::list_canaries,
        crate::inbound::http::canaries::list_trusted,
        crate::inbound::http::canaries::get_trusted,
        crate::inbound::http::canaries::trust_canary,
        crate::inbound::http::canaries::verify_canary,
        crate::inbound::http::canaries::delete_canary,
        crate::inbound::http::canaries::update_logo,
        crate::inbound::http::canaries::get_public_canary,
        crate::inbound::http::canaries::get_canary,
        crate::inbound::http::warrants::create_warrant,
        crate::inbound::http::warrants::get_draft,
        crate::inbound::http::warrants::attach_document,
        crate::inbound::http::warrants::publish_warrant,
        crate::inbound::http::warrants::get_published,
        crate::inbound::http::subscriptions::is_subscribed,
        crate::inbound::http::subscriptions::subscribe,
        crate::inbound::http::subscriptions::unsubscribe,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        CreateCanaryBody,
        CanaryResponse,
        PublicCanaryResponse,
        TrustCanaryBody,
        TrustedCanaryResponse,
        CreateWarrantBody,
        PublishWarrantBody,
        WarrantResponse,
        PublishedWarrantResponse,
        DocumentResponse,
        StatementResponse,
        SubscriptionResponse,
    )),
    tags(
        (name = "canaries", description = "Canary registration, verification, and trust anchors"),
        (name = "warrants", description = "Draft, publish, and read warrants"),
        (name = "subscriptions", description = "Follow canaries"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
