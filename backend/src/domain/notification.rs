//! Notification events, payloads, and per-user delivery preferences.
//!
//! Events are produced by the publish path and the renewal monitor and are
//! consumed by [`super::NotificationFanOut`]. They stay transport agnostic;
//! outbound adapters decide how a [`DeliveryTarget`] is reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CanaryId, PublishedWarrant, UserId};

/// Preference buckets a user can opt into per delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Reminders to the canary owner that a renewal is due.
    CanaryRenewals,
    /// Updates about canaries the user subscribes to.
    CanarySubscriptions,
    /// Survey submissions; not produced by the canary engine.
    SurveySubmissions,
}

/// What happened to the canary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new warrant was published.
    Published,
    /// The active warrant missed its renewal deadline.
    Overdue,
}

/// Event handed from the engine to the fan-out pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Event kind.
    pub kind: NotificationKind,
    /// Canary the event concerns.
    pub canary_id: CanaryId,
    /// Canary owner, reminded about overdue renewals.
    pub owner: UserId,
    /// Resolved warrant snapshot.
    pub warrant: PublishedWarrant,
}

impl NotificationEvent {
    /// Event for a freshly published warrant.
    pub fn published(owner: UserId, warrant: PublishedWarrant) -> Self {
        Self {
            kind: NotificationKind::Published,
            canary_id: warrant.canary_id,
            owner,
            warrant,
        }
    }

    /// Event for an active warrant past its renewal deadline.
    pub fn overdue(owner: UserId, warrant: PublishedWarrant) -> Self {
        Self {
            kind: NotificationKind::Overdue,
            canary_id: warrant.canary_id,
            owner,
            warrant,
        }
    }

    /// Wire payload shared by every delivery channel.
    pub fn payload(&self, category: NotificationCategory) -> NotificationPayload {
        NotificationPayload {
            kind: self.kind,
            category,
            canary_id: self.canary_id,
            warrant: self.warrant.clone(),
        }
    }
}

/// Body delivered to live channels and external transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Event kind.
    pub kind: NotificationKind,
    /// Preference bucket the delivery was selected by.
    pub category: NotificationCategory,
    /// Canary the event concerns.
    pub canary_id: CanaryId,
    /// Resolved warrant snapshot.
    pub warrant: PublishedWarrant,
}

/// Name of the live channel carrying events of `canary_id`. Subscriber
/// sessions listen on it; each event is published there once.
///
/// # Examples
/// ```
/// use canary_backend::domain::{CanaryId, live_channel_name};
///
/// let canary_id = CanaryId::random();
/// assert_eq!(live_channel_name(&canary_id), format!("canary.{canary_id}"));
/// ```
pub fn live_channel_name(canary_id: &CanaryId) -> String {
    format!("canary.{canary_id}")
}

/// One concrete place a payload is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    /// Email to the user's verified address.
    Email {
        /// Recipient address.
        address: String,
    },
    /// HTTP POST to a user-registered webhook.
    Webhook {
        /// Target URL.
        url: String,
    },
    /// Push via an ntfy topic.
    Push {
        /// Topic name.
        topic: String,
    },
}

/// Per-user delivery preferences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Verified email address, if any.
    pub email: Option<String>,
    /// Categories delivered by email.
    pub email_categories: Vec<NotificationCategory>,
    /// Webhook URLs per category.
    pub webhooks: BTreeMap<NotificationCategory, Vec<String>>,
    /// ntfy topic per category.
    pub push: BTreeMap<NotificationCategory, String>,
}

impl NotificationPreferences {
    /// Expand the preferences into concrete targets for `category`.
    ///
    /// # Examples
    /// ```
    /// use canary_backend::domain::{DeliveryTarget, NotificationCategory, NotificationPreferences};
    ///
    /// let mut prefs = NotificationPreferences::default();
    /// prefs.email = Some("ops@example.org".to_owned());
    /// prefs.email_categories.push(NotificationCategory::CanarySubscriptions);
    ///
    /// let targets = prefs.targets_for(NotificationCategory::CanarySubscriptions);
    /// assert_eq!(
    ///     targets,
    ///     vec![DeliveryTarget::Email { address: "ops@example.org".to_owned() }]
    /// );
    /// assert!(prefs.targets_for(NotificationCategory::CanaryRenewals).is_empty());
    /// ```
    pub fn targets_for(&self, category: NotificationCategory) -> Vec<DeliveryTarget> {
        let mut targets = Vec::new();
        if self.email_categories.contains(&category) {
            if let Some(address) = &self.email {
                targets.push(DeliveryTarget::Email {
                    address: address.clone(),
                });
            }
        }
        if let Some(urls) = self.webhooks.get(&category) {
            targets.extend(
                urls.iter()
                    .map(|url| DeliveryTarget::Webhook { url: url.clone() }),
            );
        }
        if let Some(topic) = self.push.get(&category) {
            targets.push(DeliveryTarget::Push {
                topic: topic.clone(),
            });
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn targets_cover_every_enabled_channel() {
        let category = NotificationCategory::CanarySubscriptions;
        let mut prefs = NotificationPreferences {
            email: Some("a@example.org".to_owned()),
            email_categories: vec![category],
            ..NotificationPreferences::default()
        };
        prefs.webhooks.insert(
            category,
            vec![
                "https://hooks.example.org/1".to_owned(),
                "https://hooks.example.org/2".to_owned(),
            ],
        );
        prefs.push.insert(category, "canary-alerts".to_owned());

        let targets = prefs.targets_for(category);
        assert_eq!(targets.len(), 4);
        assert!(targets.contains(&DeliveryTarget::Push {
            topic: "canary-alerts".to_owned()
        }));
    }

    #[rstest]
    fn email_category_without_address_yields_nothing() {
        let prefs = NotificationPreferences {
            email_categories: vec![NotificationCategory::CanaryRenewals],
            ..NotificationPreferences::default()
        };
        assert!(prefs.targets_for(NotificationCategory::CanaryRenewals).is_empty());
    }
}
