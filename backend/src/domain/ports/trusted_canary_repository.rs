//! Port for user-pinned canary trust anchors.

use async_trait::async_trait;

use crate::domain::{CanaryDomain, TrustedCanary, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by trusted canary repository adapters.
    pub enum TrustedCanaryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "trusted canary repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "trusted canary repository query failed: {message}",
    }
}

/// Port for trust anchors keyed by (user, domain).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrustedCanaryRepository: Send + Sync {
    /// Insert the anchor unless one exists for the same (user, domain).
    ///
    /// Returns `false` when a record was already present.
    async fn insert(&self, trusted: &TrustedCanary) -> Result<bool, TrustedCanaryRepositoryError>;

    /// The anchor `user` pinned for `domain`.
    async fn find(
        &self,
        user: &UserId,
        domain: &CanaryDomain,
    ) -> Result<Option<TrustedCanary>, TrustedCanaryRepositoryError>;

    /// Every anchor pinned by `user`.
    async fn list(&self, user: &UserId) -> Result<Vec<TrustedCanary>, TrustedCanaryRepositoryError>;
}
