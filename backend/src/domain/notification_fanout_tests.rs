//! Tests for notification fan-out.

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    DeliveryError, LiveChannelError, MockLiveChannel, MockNotificationPreferencesRepository,
    MockNotificationTransport, MockSubscriptionRepository, SubscriptionRepositoryError,
};
use crate::domain::{
    DeliveryTarget, NotificationPayload, NotificationPreferences, PublishedWarrant,
    RenewalOffset, Warrant,
};
use crate::test_support::{fixed_now, sample_canary, sample_statement};

type FanOut = NotificationFanOut<
    MockSubscriptionRepository,
    MockNotificationPreferencesRepository,
    MockLiveChannel,
    MockNotificationTransport,
>;

#[fixture]
fn owner() -> UserId {
    UserId::random()
}

fn snapshot(owner: &UserId) -> PublishedWarrant {
    let canary = sample_canary(owner, "example.org", true);
    let mut warrant = Warrant::draft(canary.id, owner.clone(), RenewalOffset::Week, fixed_now());
    warrant
        .publish(sample_statement())
        .expect("draft publishes");
    PublishedWarrant::try_from(warrant).expect("published snapshot")
}

fn webhook_preferences(url: &str, category: NotificationCategory) -> NotificationPreferences {
    NotificationPreferences {
        webhooks: BTreeMap::from([(category, vec![url.to_owned()])]),
        ..NotificationPreferences::default()
    }
}

fn fan_out(
    subscriptions: MockSubscriptionRepository,
    preferences: MockNotificationPreferencesRepository,
    live: MockLiveChannel,
    transport: MockNotificationTransport,
) -> FanOut {
    NotificationFanOut::new(
        Arc::new(subscriptions),
        Arc::new(preferences),
        Arc::new(live),
        Arc::new(transport),
    )
}

#[rstest]
#[tokio::test]
async fn failing_subscriber_does_not_block_the_others(owner: UserId) {
    let event = NotificationEvent::published(owner.clone(), snapshot(&owner));
    let subscribers = [UserId::random(), UserId::random(), UserId::random()];
    let failing = subscribers[1].clone();

    let mut subscriptions = MockSubscriptionRepository::new();
    let listed = subscribers.to_vec();
    subscriptions
        .expect_list_subscribers()
        .return_once(move |_| Ok(listed));

    let mut live = MockLiveChannel::new();
    live.expect_publish().times(1).returning(|_, _| Ok(()));

    let mut preferences = MockNotificationPreferencesRepository::new();
    preferences.expect_find_for_user().times(3).returning(|user| {
        Ok(Some(webhook_preferences(
            &format!("https://hooks.example.org/{user}"),
            NotificationCategory::CanarySubscriptions,
        )))
    });

    let failing_url = format!("https://hooks.example.org/{failing}");
    let mut transport = MockNotificationTransport::new();
    transport
        .expect_send()
        .times(3)
        .returning(move |target, _| match target {
            DeliveryTarget::Webhook { url } if *url == failing_url => {
                Err(DeliveryError::rejected(500_u16))
            }
            _ => Ok(()),
        });

    let report = fan_out(subscriptions, preferences, live, transport)
        .dispatch(&event)
        .await;
    assert_eq!(
        report,
        FanOutReport {
            recipients: 3,
            live_published: 1,
            delivered: 2,
            failed: 1,
        }
    );
}

#[rstest]
#[tokio::test]
async fn overdue_reminds_owner_under_renewals(owner: UserId) {
    let event = NotificationEvent::overdue(owner.clone(), snapshot(&owner));

    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions
        .expect_list_subscribers()
        .return_once(|_| Ok(Vec::new()));
    let mut live = MockLiveChannel::new();
    live.expect_publish().times(0);
    let mut preferences = MockNotificationPreferencesRepository::new();
    let expected_owner = owner.clone();
    preferences
        .expect_find_for_user()
        .withf(move |user: &UserId| user == &expected_owner)
        .times(1)
        .return_once(|_| {
            Ok(Some(NotificationPreferences {
                push: BTreeMap::from([(NotificationCategory::CanaryRenewals, "ops".to_owned())]),
                ..NotificationPreferences::default()
            }))
        });
    let mut transport = MockNotificationTransport::new();
    transport
        .expect_send()
        .withf(|target: &DeliveryTarget, payload: &NotificationPayload| {
            *target
                == DeliveryTarget::Push {
                    topic: "ops".to_owned(),
                }
                && payload.kind == NotificationKind::Overdue
                && payload.category == NotificationCategory::CanaryRenewals
        })
        .times(1)
        .return_once(|_, _| Ok(()));

    let report = fan_out(subscriptions, preferences, live, transport)
        .dispatch(&event)
        .await;
    assert_eq!(report.recipients, 1);
    assert_eq!(report.delivered, 1);
}

#[rstest]
#[tokio::test]
async fn unresolvable_subscribers_drop_the_event(owner: UserId) {
    let event = NotificationEvent::published(owner.clone(), snapshot(&owner));
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions
        .expect_list_subscribers()
        .return_once(|_| Err(SubscriptionRepositoryError::connection("down")));
    let mut live = MockLiveChannel::new();
    live.expect_publish().times(0);

    let report = fan_out(
        subscriptions,
        MockNotificationPreferencesRepository::new(),
        live,
        MockNotificationTransport::new(),
    )
    .dispatch(&event)
    .await;
    assert_eq!(report, FanOutReport::default());
}

#[rstest]
#[tokio::test]
async fn subscribers_without_preferences_get_live_only(owner: UserId) {
    let event = NotificationEvent::published(owner.clone(), snapshot(&owner));
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions
        .expect_list_subscribers()
        .return_once(|_| Ok(vec![UserId::random()]));
    let mut live = MockLiveChannel::new();
    live.expect_publish().times(1).returning(|_, _| Ok(()));
    let mut preferences = MockNotificationPreferencesRepository::new();
    preferences
        .expect_find_for_user()
        .return_once(|_| Ok(None));
    let mut transport = MockNotificationTransport::new();
    transport.expect_send().times(0);

    let report = fan_out(subscriptions, preferences, live, transport)
        .dispatch(&event)
        .await;
    assert_eq!(report.live_published, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 0);
}

#[rstest]
#[tokio::test]
async fn live_update_goes_once_to_the_canary_channel(owner: UserId) {
    let event = NotificationEvent::published(owner.clone(), snapshot(&owner));
    let expected_channel = format!("canary.{}", event.canary_id);
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions
        .expect_list_subscribers()
        .return_once(|_| Ok(vec![UserId::random(), UserId::random()]));
    let mut live = MockLiveChannel::new();
    live.expect_publish()
        .withf(move |channel: &str, payload: &NotificationPayload| {
            channel == expected_channel && payload.kind == NotificationKind::Published
        })
        .times(1)
        .return_once(|_, _| Err(LiveChannelError::publish("connection reset")));
    let mut preferences = MockNotificationPreferencesRepository::new();
    preferences.expect_find_for_user().times(2).returning(|user| {
        Ok(Some(webhook_preferences(
            &format!("https://hooks.example.org/{user}"),
            NotificationCategory::CanarySubscriptions,
        )))
    });
    let mut transport = MockNotificationTransport::new();
    transport.expect_send().times(2).returning(|_, _| Ok(()));

    let report = fan_out(subscriptions, preferences, live, transport)
        .dispatch(&event)
        .await;
    assert_eq!(
        report,
        FanOutReport {
            recipients: 2,
            live_published: 0,
            delivered: 2,
            failed: 1,
        }
    );
}
