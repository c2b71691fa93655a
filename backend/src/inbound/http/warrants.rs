//! Warrant HTTP handlers.
//!
//! ```text
//! POST /api/v1/canary/{domain}/create/warrant?otp=
//! GET  /api/v1/canary/warrant/{id}
//! POST /api/v1/canary/warrant/{id}/document/{hash}?filename=
//! POST /api/v1/canary/warrant/{id}/publish
//! GET  /api/v1/canary/published/{canaryId}/{page}
//! ```
//!
//! Document uploads carry the raw file as the request body.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    AttachDocumentRequest, CreateWarrantRequest, DocumentUpload, PublishWarrantRequest,
};
use crate::domain::{
    CanaryError, Document, Error, PublishedWarrant, Warrant, WarrantStatement,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::canaries::OtpQuery;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_concern, parse_domain, parse_published_canary_id, parse_renewal_offset,
    parse_warrant_id, require_field,
};

/// Request payload for opening a draft.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarrantBody {
    /// Renewal offset: `tomorrow`, `week`, `fortnight`, `month`, `quarter`, or `year`.
    pub next: Option<String>,
}

/// Request payload for publishing a draft.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishWarrantBody {
    pub concern: Option<String>,
    pub statement: Option<String>,
    pub signature: Option<String>,
}

/// Filename of an uploaded document.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DocumentQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub hash: String,
    pub filename: String,
    pub file_ref: String,
    pub size: u64,
}

impl From<Document> for DocumentResponse {
    fn from(value: Document) -> Self {
        Self {
            hash: value.hash,
            filename: value.filename,
            file_ref: value.file_ref,
            size: value.size,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub concern: String,
    pub statement: String,
    pub signature: String,
}

impl From<WarrantStatement> for StatementResponse {
    fn from(value: WarrantStatement) -> Self {
        Self {
            concern: value.concern.as_str().to_owned(),
            statement: value.statement,
            signature: value.signature,
        }
    }
}

/// Owner view of a draft warrant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarrantResponse {
    pub id: String,
    pub canary_id: String,
    pub issued: String,
    pub next_canary: String,
    pub expires: String,
    pub published: bool,
    pub active: bool,
    pub documents: Vec<DocumentResponse>,
}

impl From<Warrant> for WarrantResponse {
    fn from(value: Warrant) -> Self {
        Self {
            expires: value.draft_expires_at().to_rfc3339(),
            id: value.id.to_string(),
            canary_id: value.canary_id.to_string(),
            issued: value.issued.to_rfc3339(),
            next_canary: value.next_canary.to_rfc3339(),
            published: value.published,
            active: value.active,
            documents: value.documents.into_iter().map(DocumentResponse::from).collect(),
        }
    }
}

/// Public view of a published warrant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedWarrantResponse {
    pub id: String,
    pub canary_id: String,
    pub issued: String,
    pub next_canary: String,
    pub active: bool,
    pub statement: StatementResponse,
    pub documents: Vec<DocumentResponse>,
}

impl From<PublishedWarrant> for PublishedWarrantResponse {
    fn from(value: PublishedWarrant) -> Self {
        Self {
            id: value.id.to_string(),
            canary_id: value.canary_id.to_string(),
            issued: value.issued.to_rfc3339(),
            next_canary: value.next_canary.to_rfc3339(),
            active: value.active,
            statement: StatementResponse::from(value.statement),
            documents: value.documents.into_iter().map(DocumentResponse::from).collect(),
        }
    }
}

fn parse_statement(body: PublishWarrantBody) -> Result<WarrantStatement, Error> {
    let concern = require_field(body.concern, FieldName::new("concern"))?;
    let concern = parse_concern(&concern, FieldName::new("concern"))?;
    let statement = WarrantStatement::new(
        concern,
        body.statement.unwrap_or_default(),
        require_field(body.signature, FieldName::new("signature"))?,
    )?;
    Ok(statement)
}

/// Open a draft warrant for a verified canary.
#[utoipa::path(
    post,
    path = "/api/v1/canary/{domain}/create/warrant",
    params(("domain" = String, Path, description = "Canary domain"), OtpQuery),
    request_body = CreateWarrantBody,
    responses(
        (status = 201, description = "Draft created", body = WarrantResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Canary not found", body = Error),
        (status = 412, description = "Domain unverified or one-time password rejected", body = Error)
    ),
    tags = ["warrants"],
    operation_id = "createWarrant"
)]
#[post("/canary/{domain}/create/warrant")]
pub async fn create_warrant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<OtpQuery>,
    payload: web::Json<CreateWarrantBody>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let domain = parse_domain(&path.into_inner())?;
    let otp = require_field(query.into_inner().otp, FieldName::new("otp"))?;
    let next = require_field(payload.into_inner().next, FieldName::new("next"))?;
    let offset = parse_renewal_offset(&next, FieldName::new("next"))?;
    let warrant = state
        .warrants
        .create_warrant(CreateWarrantRequest {
            domain,
            offset,
            caller,
            otp,
        })
        .await?;
    Ok(HttpResponse::Created().json(WarrantResponse::from(warrant)))
}

/// Fetch one of the caller's live drafts.
#[utoipa::path(
    get,
    path = "/api/v1/canary/warrant/{id}",
    params(("id" = String, Path, description = "Warrant id")),
    responses(
        (status = 200, description = "Draft warrant", body = WarrantResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Warrant not found or expired", body = Error)
    ),
    tags = ["warrants"],
    operation_id = "getDraftWarrant"
)]
#[get("/canary/warrant/{id}")]
pub async fn get_draft(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<WarrantResponse>> {
    let caller = session.require_caller()?;
    let warrant_id = parse_warrant_id(&path.into_inner())?;
    let warrant = state.warrant_query.get_draft(&warrant_id, &caller).await?;
    Ok(web::Json(WarrantResponse::from(warrant)))
}

/// Attach a document to a live draft.
#[utoipa::path(
    post,
    path = "/api/v1/canary/warrant/{id}/document/{hash}",
    params(
        ("id" = String, Path, description = "Warrant id"),
        ("hash" = String, Path, description = "Client-side document hash"),
        DocumentQuery
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 204, description = "Document attached"),
        (status = 400, description = "Invalid document", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Warrant not found", body = Error),
        (status = 412, description = "Document limit reached", body = Error)
    ),
    tags = ["warrants"],
    operation_id = "attachDocument"
)]
#[post("/canary/warrant/{id}/document/{hash}")]
pub async fn attach_document(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    query: web::Query<DocumentQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let (id, hash) = path.into_inner();
    let warrant_id = parse_warrant_id(&id)?;
    let filename = require_field(query.into_inner().filename, FieldName::new("filename"))?;
    if body.is_empty() {
        return Err(CanaryError::validation("document must not be empty").into());
    }
    state
        .warrants
        .attach_document(AttachDocumentRequest {
            warrant_id,
            hash,
            upload: DocumentUpload {
                filename,
                content: body.to_vec(),
            },
            caller,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Publish a live draft, superseding the canary's active warrant.
#[utoipa::path(
    post,
    path = "/api/v1/canary/warrant/{id}/publish",
    params(("id" = String, Path, description = "Warrant id")),
    request_body = PublishWarrantBody,
    responses(
        (status = 204, description = "Warrant published"),
        (status = 400, description = "Invalid statement", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Warrant not found", body = Error)
    ),
    tags = ["warrants"],
    operation_id = "publishWarrant"
)]
#[post("/canary/warrant/{id}/publish")]
pub async fn publish_warrant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<PublishWarrantBody>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let warrant_id = parse_warrant_id(&path.into_inner())?;
    let statement = parse_statement(payload.into_inner())?;
    state
        .warrants
        .publish(PublishWarrantRequest {
            warrant_id,
            statement,
            caller,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// The `page`-th newest published warrant of a canary.
#[utoipa::path(
    get,
    path = "/api/v1/canary/published/{canaryId}/{page}",
    params(
        ("canaryId" = String, Path, description = "Canary id"),
        ("page" = u32, Path, description = "Zero-based page, newest first")
    ),
    responses(
        (status = 200, description = "Published warrant", body = PublishedWarrantResponse),
        (status = 404, description = "No warrant at this page", body = Error)
    ),
    tags = ["warrants"],
    security([]),
    operation_id = "getPublishedWarrant"
)]
#[get("/canary/published/{canary_id}/{page}")]
pub async fn get_published(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<PublishedWarrantResponse>> {
    let (canary_id, page) = path.into_inner();
    let canary_id = parse_published_canary_id(&canary_id)?;
    let page = page
        .parse::<u32>()
        .map_err(|_| Error::from(CanaryError::WarrantNotFound))?;
    let warrant = state.warrant_query.get_published(&canary_id, page).await?;
    Ok(web::Json(PublishedWarrantResponse::from(warrant)))
}

#[cfg(test)]
#[path = "warrants_tests.rs"]
mod tests;
