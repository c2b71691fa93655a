//! Port for warrant persistence.
//!
//! The repository is the source of truth for the warrant state machine. Every
//! mutating method is a conditional write: it only takes effect when the
//! stored record still matches the expected pre-state, and it reports whether
//! it did. Callers never read-modify-write a warrant.
//!
//! Draft expiry is part of the contract. Drafts issued at or before
//! `now - 3h` must be invisible to every read and write that takes `now`,
//! whether or not [`WarrantRepository::purge_expired_drafts`] has run yet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CanaryId, Document, UserId, Warrant, WarrantId, WarrantStatement};

use super::define_port_error;

define_port_error! {
    /// Errors raised by warrant repository adapters.
    pub enum WarrantRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "warrant repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "warrant repository query failed: {message}",
    }
}

/// Port for storing warrants and applying lifecycle transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarrantRepository: Send + Sync {
    /// Persist a new draft.
    async fn insert(&self, warrant: &Warrant) -> Result<(), WarrantRepositoryError>;

    /// Find a live draft owned by `owner`.
    ///
    /// Returns `None` when the warrant is missing, owned by someone else,
    /// already published, or expired at `now`.
    async fn find_open_draft(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError>;

    /// Append `document` to a live draft owned by `owner` holding fewer than
    /// `max_documents` documents.
    ///
    /// Returns `false` when any condition no longer holds.
    async fn append_document(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        document: &Document,
        max_documents: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, WarrantRepositoryError>;

    /// Publish a live draft owned by `owner` and supersede every other
    /// warrant of the same canary.
    ///
    /// The activation is conditional on `published = false`; when it does
    /// not apply, nothing is written and `None` is returned. When it does,
    /// the sibling deactivation is applied in the same atomic step so no
    /// reader observes two active warrants, and the published warrant is
    /// returned.
    async fn publish(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        statement: &WarrantStatement,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError>;

    /// Fetch the `page`-th most recently issued published warrant of a
    /// canary (zero based).
    async fn find_published(
        &self,
        canary_id: &CanaryId,
        page: u32,
    ) -> Result<Option<Warrant>, WarrantRepositoryError>;

    /// List active warrants whose renewal deadline passed before `now` and
    /// whose overdue alert has not fired.
    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Warrant>, WarrantRepositoryError>;

    /// Claim the overdue alert of an active warrant.
    ///
    /// Returns `true` only for the single caller that flipped
    /// `overdue_notified` from `false` to `true`.
    async fn mark_overdue_notified(
        &self,
        warrant_id: &WarrantId,
    ) -> Result<bool, WarrantRepositoryError>;

    /// Delete drafts expired at `now`, returning how many were removed.
    async fn purge_expired_drafts(&self, now: DateTime<Utc>)
    -> Result<u64, WarrantRepositoryError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn query_error_formats_message() {
        let err = WarrantRepositoryError::query("broken sql");
        assert!(err.to_string().contains("broken sql"));
    }

    #[rstest]
    fn connection_error_formats_message() {
        let err = WarrantRepositoryError::connection("pool exhausted");
        assert_eq!(
            err.to_string(),
            "warrant repository connection failed: pool exhausted"
        );
    }
}
