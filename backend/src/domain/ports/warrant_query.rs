//! Driving port for warrant reads.

use async_trait::async_trait;

use crate::domain::{CanaryError, CanaryId, PublishedWarrant, UserId, Warrant, WarrantId};

/// Port for reading published warrants and the caller's own drafts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarrantQuery: Send + Sync {
    /// The `page`-th newest published warrant of a canary. Anonymous.
    async fn get_published(
        &self,
        canary_id: &CanaryId,
        page: u32,
    ) -> Result<PublishedWarrant, CanaryError>;

    /// A live draft owned by `caller`. Drafts older than the retention
    /// window are reported as not found.
    async fn get_draft(
        &self,
        warrant_id: &WarrantId,
        caller: &UserId,
    ) -> Result<Warrant, CanaryError>;
}
