//! Subscription service: idempotent follow and unfollow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::port_error_mapping::{map_canary_error, map_subscription_error};
use crate::domain::ports::{CanaryRepository, SubscriptionCommand, SubscriptionRepository};
use crate::domain::{CanaryError, CanaryId, UserId};

/// Subscription service implementing [`SubscriptionCommand`].
pub struct SubscriptionService<S, C> {
    subscriptions: Arc<S>,
    canaries: Arc<C>,
}

impl<S, C> Clone for SubscriptionService<S, C> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: Arc::clone(&self.subscriptions),
            canaries: Arc::clone(&self.canaries),
        }
    }
}

impl<S, C> SubscriptionService<S, C> {
    /// Create the service.
    pub fn new(subscriptions: Arc<S>, canaries: Arc<C>) -> Self {
        Self {
            subscriptions,
            canaries,
        }
    }
}

#[async_trait]
impl<S, C> SubscriptionCommand for SubscriptionService<S, C>
where
    S: SubscriptionRepository,
    C: CanaryRepository,
{
    async fn subscribe(&self, canary_id: &CanaryId, caller: &UserId) -> Result<(), CanaryError> {
        if self
            .canaries
            .find_by_id(canary_id)
            .await
            .map_err(map_canary_error)?
            .is_none()
        {
            return Err(CanaryError::CanaryNotFound);
        }
        self.subscriptions
            .subscribe(caller, canary_id)
            .await
            .map_err(map_subscription_error)?;
        debug!(%canary_id, subscriber = %caller, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, canary_id: &CanaryId, caller: &UserId) -> Result<(), CanaryError> {
        self.subscriptions
            .unsubscribe(caller, canary_id)
            .await
            .map_err(map_subscription_error)?;
        debug!(%canary_id, subscriber = %caller, "unsubscribed");
        Ok(())
    }

    async fn is_subscribed(&self, canary_id: &CanaryId, caller: &UserId) -> Result<bool, CanaryError> {
        self.subscriptions
            .is_subscribed(caller, canary_id)
            .await
            .map_err(map_subscription_error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;
    use crate::domain::ports::{MockCanaryRepository, MockSubscriptionRepository};
    use crate::test_support::sample_canary;

    #[tokio::test]
    async fn subscribe_to_unknown_canary_is_not_found() {
        let mut canaries = MockCanaryRepository::new();
        canaries.expect_find_by_id().return_once(|_| Ok(None));
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions.expect_subscribe().times(0);

        let err = SubscriptionService::new(Arc::new(subscriptions), Arc::new(canaries))
            .subscribe(&CanaryId::random(), &UserId::random())
            .await
            .expect_err("unknown canary");
        assert_eq!(err, CanaryError::CanaryNotFound);
    }

    #[tokio::test]
    async fn subscribe_records_relation() {
        let owner = UserId::random();
        let canary = sample_canary(&owner, "example.org", true);
        let canary_id = canary.id;
        let subscriber = UserId::random();
        let expected = subscriber.clone();
        let mut canaries = MockCanaryRepository::new();
        canaries
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(canary)));
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_subscribe()
            .withf(move |user: &UserId, id: &CanaryId| user == &expected && *id == canary_id)
            .times(1)
            .return_once(|_, _| Ok(()));

        SubscriptionService::new(Arc::new(subscriptions), Arc::new(canaries))
            .subscribe(&canary_id, &subscriber)
            .await
            .expect("subscribed");
    }
}
