//! Driving port for canary reads.

use async_trait::async_trait;

use crate::domain::{Canary, CanaryDomain, CanaryError, PublicCanary, TrustedCanary, UserId};

/// Port for canary and trust anchor reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CanaryQuery: Send + Sync {
    /// Canaries owned by `caller`.
    async fn list_canaries(&self, caller: &UserId) -> Result<Vec<Canary>, CanaryError>;

    /// Owner view, including the verification challenge.
    async fn get_canary(&self, domain: &CanaryDomain, caller: &UserId) -> Result<Canary, CanaryError>;

    /// Anonymous view.
    async fn get_public_canary(&self, domain: &CanaryDomain) -> Result<PublicCanary, CanaryError>;

    /// The anchor `caller` pinned for `domain`.
    async fn get_trusted(
        &self,
        domain: &CanaryDomain,
        caller: &UserId,
    ) -> Result<TrustedCanary, CanaryError>;

    /// Every anchor pinned by `caller`.
    async fn list_trusted(&self, caller: &UserId) -> Result<Vec<TrustedCanary>, CanaryError>;
}
