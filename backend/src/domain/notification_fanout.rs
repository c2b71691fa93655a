//! Best-effort notification fan-out.
//!
//! One event becomes a single publish on the canary's live channel, when it
//! has subscribers, plus one send per matching preference target of every
//! recipient. Recipients are handled concurrently and independently.
//! Failures are logged and counted; nothing is retried and nothing
//! propagates.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    LiveChannel, NotificationPreferencesRepository, NotificationTransport,
    SubscriptionRepository,
};
use crate::domain::{
    NotificationCategory, NotificationEvent, NotificationKind, UserId, live_channel_name,
};

/// Counters describing one fan-out run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Recipients the event was addressed to.
    pub recipients: usize,
    /// Live channel publishes that succeeded, at most one per event.
    pub live_published: usize,
    /// External sends that succeeded.
    pub delivered: usize,
    /// Live publishes and external sends that failed.
    pub failed: usize,
}

impl FanOutReport {
    fn merge(mut self, other: Self) -> Self {
        self.recipients += other.recipients;
        self.live_published += other.live_published;
        self.delivered += other.delivered;
        self.failed += other.failed;
        self
    }
}

/// Something that turns a queued event into deliveries.
///
/// The queue worker depends on this instead of the concrete fan-out so it
/// stays independent of the port types behind it.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    /// Deliver `event`, best effort.
    async fn dispatch(&self, event: &NotificationEvent) -> FanOutReport;
}

/// Who receives an event and under which preference bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Recipient {
    user: UserId,
    category: NotificationCategory,
}

/// Resolves recipients and dispatches an event to each of them.
pub struct NotificationFanOut<S, P, L: ?Sized, T> {
    subscriptions: Arc<S>,
    preferences: Arc<P>,
    live: Arc<L>,
    transport: Arc<T>,
}

impl<S, P, L: ?Sized, T> NotificationFanOut<S, P, L, T> {
    /// Create a fan-out over the given ports.
    pub fn new(subscriptions: Arc<S>, preferences: Arc<P>, live: Arc<L>, transport: Arc<T>) -> Self {
        Self {
            subscriptions,
            preferences,
            live,
            transport,
        }
    }
}

impl<S, P, L: ?Sized, T> NotificationFanOut<S, P, L, T>
where
    S: SubscriptionRepository,
    P: NotificationPreferencesRepository,
    L: LiveChannel,
    T: NotificationTransport,
{
    /// Deliver `event` to every recipient, best effort.
    pub async fn dispatch(&self, event: &NotificationEvent) -> FanOutReport {
        let canary_id = event.canary_id;
        let subscribers = match self.subscriptions.list_subscribers(&canary_id).await {
            Ok(subscribers) => subscribers,
            Err(error) => {
                warn!(%canary_id, %error, "could not resolve subscribers; event dropped");
                Vec::new()
            }
        };

        let mut recipients: Vec<Recipient> = subscribers
            .into_iter()
            .map(|user| Recipient {
                user,
                category: NotificationCategory::CanarySubscriptions,
            })
            .collect();
        let live = if recipients.is_empty() {
            FanOutReport::default()
        } else {
            self.publish_live(event).await
        };
        if event.kind == NotificationKind::Overdue {
            recipients.push(Recipient {
                user: event.owner.clone(),
                category: NotificationCategory::CanaryRenewals,
            });
        }

        let outcomes = join_all(
            recipients
                .iter()
                .map(|recipient| self.deliver_to(recipient, event)),
        )
        .await;
        let report = outcomes.into_iter().fold(live, FanOutReport::merge);
        info!(
            %canary_id,
            warrant_id = %event.warrant.id,
            kind = ?event.kind,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "notification fan-out finished"
        );
        report
    }

    async fn publish_live(&self, event: &NotificationEvent) -> FanOutReport {
        let canary_id = event.canary_id;
        let payload = event.payload(NotificationCategory::CanarySubscriptions);
        match self.live.publish(&live_channel_name(&canary_id), &payload).await {
            Ok(()) => FanOutReport {
                live_published: 1,
                ..FanOutReport::default()
            },
            Err(error) => {
                warn!(%canary_id, %error, "live channel publish failed");
                FanOutReport {
                    failed: 1,
                    ..FanOutReport::default()
                }
            }
        }
    }

    async fn deliver_to(&self, recipient: &Recipient, event: &NotificationEvent) -> FanOutReport {
        let mut report = FanOutReport {
            recipients: 1,
            ..FanOutReport::default()
        };
        let payload = event.payload(recipient.category);
        let canary_id = event.canary_id;
        let subscriber = &recipient.user;

        let preferences = match self.preferences.find_for_user(subscriber).await {
            Ok(Some(preferences)) => preferences,
            Ok(None) => return report,
            Err(error) => {
                report.failed += 1;
                warn!(%canary_id, %subscriber, %error, "could not load notification preferences");
                return report;
            }
        };
        let targets = preferences.targets_for(recipient.category);
        let sends = join_all(
            targets
                .iter()
                .map(|target| self.transport.send(target, &payload)),
        )
        .await;
        for (target, outcome) in targets.iter().zip(sends) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(%canary_id, %subscriber, ?target, %error, "notification delivery failed");
                }
            }
        }
        debug!(%canary_id, %subscriber, delivered = report.delivered, "recipient handled");
        report
    }
}

#[async_trait]
impl<S, P, L: ?Sized, T> NotificationDispatcher for NotificationFanOut<S, P, L, T>
where
    S: SubscriptionRepository + 'static,
    P: NotificationPreferencesRepository + 'static,
    L: LiveChannel + 'static,
    T: NotificationTransport + 'static,
{
    async fn dispatch(&self, event: &NotificationEvent) -> FanOutReport {
        NotificationFanOut::dispatch(self, event).await
    }
}

#[cfg(test)]
#[path = "notification_fanout_tests.rs"]
mod tests;
