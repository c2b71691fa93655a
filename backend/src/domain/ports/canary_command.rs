//! Driving port for canary registration, verification, deletion, trust, and
//! logos.

use async_trait::async_trait;

use crate::domain::{Canary, CanaryDomain, CanaryError, CanaryProfile, UserId};

use super::DocumentUpload;

/// Request to register a canary for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCanaryRequest {
    pub domain: CanaryDomain,
    pub profile: CanaryProfile,
    pub caller: UserId,
}

/// Request to pin a trust anchor for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustCanaryRequest {
    pub domain: CanaryDomain,
    pub public_key_hash: String,
    pub caller: UserId,
}

/// Port for canary mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CanaryCommand: Send + Sync {
    /// Register a new, unverified canary.
    async fn create_canary(&self, request: CreateCanaryRequest) -> Result<Canary, CanaryError>;

    /// Ask the DNS verifier to confirm ownership; completion is recorded
    /// once.
    async fn verify_canary(&self, domain: &CanaryDomain, caller: &UserId) -> Result<(), CanaryError>;

    /// Delete an owned canary after a fresh one-time password check.
    async fn delete_canary(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
        otp: &str,
    ) -> Result<(), CanaryError>;

    /// Pin a trust anchor for an existing canary domain.
    async fn trust_canary(&self, request: TrustCanaryRequest) -> Result<(), CanaryError>;

    /// Store a new logo for an owned canary and return the updated canary.
    async fn update_logo(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
        upload: DocumentUpload,
    ) -> Result<Canary, CanaryError>;
}
