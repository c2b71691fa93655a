//! Port for canary subscriptions.

use async_trait::async_trait;

use crate::domain::{CanaryId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by subscription repository adapters.
    pub enum SubscriptionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "subscription repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "subscription repository query failed: {message}",
    }
}

/// Port for the (subscriber, canary) relation. All writes are idempotent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Record the subscription unless it already exists.
    async fn subscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError>;

    /// Remove the subscription if present.
    async fn unsubscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError>;

    /// Whether `subscriber` follows `canary_id`.
    async fn is_subscribed(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<bool, SubscriptionRepositoryError>;

    /// Distinct subscribers of a canary.
    async fn list_subscribers(
        &self,
        canary_id: &CanaryId,
    ) -> Result<Vec<UserId>, SubscriptionRepositoryError>;
}
