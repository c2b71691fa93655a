//! Canary HTTP handlers.
//!
//! ```text
//! POST   /api/v1/canary/create
//! GET    /api/v1/canary/list
//! GET    /api/v1/canary/trusted/list
//! GET    /api/v1/canary/{domain}/trusted
//! POST   /api/v1/canary/{domain}/trusted/add
//! POST   /api/v1/canary/{domain}/verify
//! DELETE /api/v1/canary/{domain}/delete?otp=
//! POST   /api/v1/canary/{domain}/logo/update?filename=
//! GET    /api/v1/canary/{domain}/public
//! GET    /api/v1/canary/{domain}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{CreateCanaryRequest, DocumentUpload, TrustCanaryRequest};
use crate::domain::{Canary, CanaryError, CanaryProfile, Error, PublicCanary, TrustedCanary};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_domain, require_field};

/// Request payload for registering a canary.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCanaryBody {
    pub domain: Option<String>,
    pub name: Option<String>,
    pub about: Option<String>,
}

/// Owner view of a canary, including the DNS challenge.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanaryResponse {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub about: String,
    pub verified: bool,
    pub challenge: String,
    pub logo: Option<String>,
    pub created: String,
}

impl From<Canary> for CanaryResponse {
    fn from(value: Canary) -> Self {
        Self {
            id: value.id.to_string(),
            domain: value.domain.to_string(),
            name: value.profile.name,
            about: value.profile.about,
            verified: value.verification.completed,
            challenge: value.verification.code,
            logo: value.logo,
            created: value.created.to_rfc3339(),
        }
    }
}

/// Anonymous view of a canary.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicCanaryResponse {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub about: String,
    pub verified: bool,
    pub logo: Option<String>,
    pub created: String,
}

impl From<PublicCanary> for PublicCanaryResponse {
    fn from(value: PublicCanary) -> Self {
        Self {
            id: value.id.to_string(),
            domain: value.domain.to_string(),
            name: value.profile.name,
            about: value.profile.about,
            verified: value.verified,
            logo: value.logo,
            created: value.created.to_rfc3339(),
        }
    }
}

/// Request payload for pinning a trust anchor.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustCanaryBody {
    pub public_key_hash: Option<String>,
}

/// A pinned trust anchor.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustedCanaryResponse {
    pub domain: String,
    pub public_key_hash: String,
}

impl From<TrustedCanary> for TrustedCanaryResponse {
    fn from(value: TrustedCanary) -> Self {
        Self {
            domain: value.domain.to_string(),
            public_key_hash: value.public_key_hash,
        }
    }
}

/// Second-factor query parameter for destructive or privileged calls.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OtpQuery {
    /// Freshly generated one-time password.
    pub otp: Option<String>,
}

/// Filename of an uploaded logo.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LogoQuery {
    pub filename: Option<String>,
}

fn parse_create_body(body: CreateCanaryBody) -> Result<(String, CanaryProfile), Error> {
    let domain = require_field(body.domain, FieldName::new("domain"))?;
    let name = require_field(body.name, FieldName::new("name"))?;
    let profile = CanaryProfile::new(name, body.about.unwrap_or_default())?;
    Ok((domain, profile))
}

/// Register a canary for a domain.
#[utoipa::path(
    post,
    path = "/api/v1/canary/create",
    request_body = CreateCanaryBody,
    responses(
        (status = 201, description = "Canary registered", body = CanaryResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 412, description = "Domain already taken", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "createCanary"
)]
#[post("/canary/create")]
pub async fn create_canary(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateCanaryBody>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let (domain, profile) = parse_create_body(payload.into_inner())?;
    let canary = state
        .canaries
        .create_canary(CreateCanaryRequest {
            domain: parse_domain(&domain)?,
            profile,
            caller,
        })
        .await?;
    Ok(HttpResponse::Created().json(CanaryResponse::from(canary)))
}

/// List canaries owned by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/canary/list",
    responses(
        (status = 200, description = "Owned canaries", body = [CanaryResponse]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "listCanaries"
)]
#[get("/canary/list")]
pub async fn list_canaries(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<CanaryResponse>>> {
    let caller = session.require_caller()?;
    let canaries = state.canary_query.list_canaries(&caller).await?;
    Ok(web::Json(
        canaries.into_iter().map(CanaryResponse::from).collect(),
    ))
}

/// List every trust anchor the caller pinned.
#[utoipa::path(
    get,
    path = "/api/v1/canary/trusted/list",
    responses(
        (status = 200, description = "Pinned trust anchors", body = [TrustedCanaryResponse]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "listTrustedCanaries"
)]
#[get("/canary/trusted/list")]
pub async fn list_trusted(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<TrustedCanaryResponse>>> {
    let caller = session.require_caller()?;
    let trusted = state.canary_query.list_trusted(&caller).await?;
    Ok(web::Json(
        trusted.into_iter().map(TrustedCanaryResponse::from).collect(),
    ))
}

/// Fetch the trust anchor the caller pinned for a domain.
#[utoipa::path(
    get,
    path = "/api/v1/canary/{domain}/trusted",
    params(("domain" = String, Path, description = "Canary domain")),
    responses(
        (status = 200, description = "Pinned trust anchor", body = TrustedCanaryResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not trusted", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "getTrustedCanary"
)]
#[get("/canary/{domain}/trusted")]
pub async fn get_trusted(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<TrustedCanaryResponse>> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let trusted = state.canary_query.get_trusted(&domain, &caller).await?;
    Ok(web::Json(TrustedCanaryResponse::from(trusted)))
}

/// Pin a trust anchor for a domain.
#[utoipa::path(
    post,
    path = "/api/v1/canary/{domain}/trusted/add",
    params(("domain" = String, Path, description = "Canary domain")),
    request_body = TrustCanaryBody,
    responses(
        (status = 204, description = "Trust anchor pinned"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error),
        (status = 412, description = "Already trusted", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "trustCanary"
)]
#[post("/canary/{domain}/trusted/add")]
pub async fn trust_canary(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<TrustCanaryBody>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let public_key_hash = require_field(
        payload.into_inner().public_key_hash,
        FieldName::new("publicKeyHash"),
    )?;
    state
        .canaries
        .trust_canary(TrustCanaryRequest {
            domain,
            public_key_hash,
            caller,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Check the DNS challenge for an owned canary.
#[utoipa::path(
    post,
    path = "/api/v1/canary/{domain}/verify",
    params(("domain" = String, Path, description = "Canary domain")),
    responses(
        (status = 204, description = "Domain verified"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error),
        (status = 412, description = "Challenge not found in DNS", body = Error),
        (status = 503, description = "Resolver unavailable", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "verifyCanary"
)]
#[post("/canary/{domain}/verify")]
pub async fn verify_canary(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    state.canaries.verify_canary(&domain, &caller).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Delete an owned canary, its warrants, and its subscriptions.
#[utoipa::path(
    delete,
    path = "/api/v1/canary/{domain}/delete",
    params(("domain" = String, Path, description = "Canary domain"), OtpQuery),
    responses(
        (status = 204, description = "Canary deleted"),
        (status = 400, description = "Missing one-time password", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error),
        (status = 412, description = "One-time password rejected", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "deleteCanary"
)]
#[delete("/canary/{domain}/delete")]
pub async fn delete_canary(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<OtpQuery>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let otp = require_field(query.into_inner().otp, FieldName::new("otp"))?;
    state.canaries.delete_canary(&domain, &caller, &otp).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Replace the logo of an owned canary. The request body is the image.
#[utoipa::path(
    post,
    path = "/api/v1/canary/{domain}/logo/update",
    params(("domain" = String, Path, description = "Canary domain"), LogoQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Logo stored", body = CanaryResponse),
        (status = 400, description = "Invalid image", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "updateCanaryLogo"
)]
#[post("/canary/{domain}/logo/update")]
pub async fn update_logo(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<LogoQuery>,
    body: web::Bytes,
) -> ApiResult<web::Json<CanaryResponse>> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let filename = require_field(query.into_inner().filename, FieldName::new("filename"))?;
    if body.is_empty() {
        return Err(CanaryError::validation("logo must not be empty").into());
    }
    let canary = state
        .canaries
        .update_logo(
            &domain,
            &caller,
            DocumentUpload {
                filename,
                content: body.to_vec(),
            },
        )
        .await?;
    Ok(web::Json(CanaryResponse::from(canary)))
}

/// Anonymous view of a canary.
#[utoipa::path(
    get,
    path = "/api/v1/canary/{domain}/public",
    params(("domain" = String, Path, description = "Canary domain")),
    responses(
        (status = 200, description = "Public canary", body = PublicCanaryResponse),
        (status = 404, description = "Canary not found", body = Error)
    ),
    tags = ["canaries"],
    security([]),
    operation_id = "getPublicCanary"
)]
#[get("/canary/{domain}/public")]
pub async fn get_public_canary(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PublicCanaryResponse>> {
    let domain = parse_domain(&path.into_inner())?;
    let canary = state.canary_query.get_public_canary(&domain).await?;
    Ok(web::Json(PublicCanaryResponse::from(canary)))
}

/// Owner view of a canary.
#[utoipa::path(
    get,
    path = "/api/v1/canary/{domain}",
    params(("domain" = String, Path, description = "Canary domain")),
    responses(
        (status = 200, description = "Owned canary", body = CanaryResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error)
    ),
    tags = ["canaries"],
    operation_id = "getCanary"
)]
#[get("/canary/{domain}")]
pub async fn get_canary(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CanaryResponse>> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let canary = state.canary_query.get_canary(&domain, &caller).await?;
    Ok(web::Json(CanaryResponse::from(canary)))
}

#[cfg(test)]
#[path = "canaries_tests.rs"]
mod tests;
