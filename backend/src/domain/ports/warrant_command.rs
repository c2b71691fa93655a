//! Driving port for warrant lifecycle mutations.
//!
//! Creating, filling, and publishing a warrant. Every failure is a typed
//! [`CanaryError`]; notification delivery never surfaces here.

use async_trait::async_trait;

use crate::domain::{CanaryDomain, CanaryError, RenewalOffset, UserId, Warrant, WarrantId, WarrantStatement};

use super::DocumentUpload;

/// Request to open a new draft warrant for a canary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWarrantRequest {
    pub domain: CanaryDomain,
    pub offset: RenewalOffset,
    pub caller: UserId,
    pub otp: String,
}

/// Request to attach a document to a draft warrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachDocumentRequest {
    pub warrant_id: WarrantId,
    pub hash: String,
    pub upload: DocumentUpload,
    pub caller: UserId,
}

/// Request to publish a draft warrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishWarrantRequest {
    pub warrant_id: WarrantId,
    pub statement: WarrantStatement,
    pub caller: UserId,
}

/// Port for warrant state machine transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarrantCommand: Send + Sync {
    /// Open a draft. Requires a verified domain owned by the caller and a
    /// valid one-time password.
    async fn create_warrant(&self, request: CreateWarrantRequest) -> Result<Warrant, CanaryError>;

    /// Store and attach a document to a live draft owned by the caller.
    async fn attach_document(&self, request: AttachDocumentRequest) -> Result<(), CanaryError>;

    /// Publish a live draft owned by the caller, superseding the canary's
    /// previous active warrant. Subscribers are notified asynchronously.
    async fn publish(&self, request: PublishWarrantRequest) -> Result<(), CanaryError>;
}
