//! Driving port for following canaries.

use async_trait::async_trait;

use crate::domain::{CanaryError, CanaryId, UserId};

/// Idempotent subscription management for the calling user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionCommand: Send + Sync {
    /// Follow a canary. Subscribing twice is a no-op.
    async fn subscribe(&self, canary_id: &CanaryId, caller: &UserId) -> Result<(), CanaryError>;

    /// Stop following a canary. Unsubscribing twice is a no-op.
    async fn unsubscribe(&self, canary_id: &CanaryId, caller: &UserId) -> Result<(), CanaryError>;

    /// Whether the caller follows a canary.
    async fn is_subscribed(&self, canary_id: &CanaryId, caller: &UserId) -> Result<bool, CanaryError>;
}
