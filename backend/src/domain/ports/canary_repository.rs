//! Port for canary persistence.

use async_trait::async_trait;

use crate::domain::{Canary, CanaryDomain, CanaryId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by canary repository adapters.
    pub enum CanaryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "canary repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "canary repository query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Duplicate =>
            "canary already exists for this domain",
    }
}

/// Outcome of [`CanaryRepository::set_logo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoUpdate {
    /// The canary no longer exists; nothing was written.
    Missing,
    /// The logo reference was stored, replacing `previous`.
    Replaced { previous: Option<String> },
}

/// Port for registering, reading, verifying, and deleting canaries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CanaryRepository: Send + Sync {
    /// Persist a newly registered canary.
    ///
    /// Returns [`CanaryRepositoryError::Duplicate`] when a uniqueness rule
    /// rejects the insert.
    async fn insert(&self, canary: &Canary) -> Result<(), CanaryRepositoryError>;

    /// Whether `domain` is unavailable to `requester`: verified by anyone,
    /// already registered by `requester`, or blocked by a deletion record.
    async fn is_domain_taken(
        &self,
        domain: &CanaryDomain,
        requester: &UserId,
    ) -> Result<bool, CanaryRepositoryError>;

    /// Canonical canary for a domain: the verified one when it exists,
    /// otherwise the earliest registration.
    async fn find_by_domain(
        &self,
        domain: &CanaryDomain,
    ) -> Result<Option<Canary>, CanaryRepositoryError>;

    /// The canary `owner` registered for `domain`.
    async fn find_owned(
        &self,
        domain: &CanaryDomain,
        owner: &UserId,
    ) -> Result<Option<Canary>, CanaryRepositoryError>;

    /// Point lookup by id.
    async fn find_by_id(&self, id: &CanaryId) -> Result<Option<Canary>, CanaryRepositoryError>;

    /// Every canary owned by `owner`, oldest first.
    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Canary>, CanaryRepositoryError>;

    /// Flip domain verification from incomplete to complete.
    ///
    /// Returns `false` when the canary is missing, already verified, or
    /// another canary for the same domain completed verification first.
    async fn mark_verified(&self, id: &CanaryId) -> Result<bool, CanaryRepositoryError>;

    /// Point the canary's logo at `file_ref`, returning the reference it
    /// replaced in the same atomic step.
    async fn set_logo(
        &self,
        id: &CanaryId,
        file_ref: &str,
    ) -> Result<LogoUpdate, CanaryRepositoryError>;

    /// Remove a canary with its warrants and subscriptions, recording the
    /// domain fingerprint so the domain cannot be registered again.
    async fn delete(&self, canary: &Canary) -> Result<(), CanaryRepositoryError>;
}
