//! Tests for the renewal monitor and draft reaper.

use std::sync::Arc;

use chrono::TimeDelta;

use super::*;
use crate::domain::ports::{
    MockNotificationQueue, MockWarrantRepository, NotificationQueueError, WarrantRepository,
    WarrantRepositoryError,
};
use crate::outbound::memory::InMemoryCanaryStore;
use crate::domain::{NotificationKind, RenewalOffset, UserId, WarrantId};
use crate::test_support::{MutableClock, fixed_now, sample_canary, sample_statement};

fn lapsed_warrant() -> Warrant {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let issued = fixed_now() - TimeDelta::days(2);
    let mut warrant = Warrant::draft(canary.id, owner, RenewalOffset::Tomorrow, issued);
    warrant
        .publish(sample_statement())
        .expect("draft publishes");
    warrant
}

fn monitor(
    warrants: MockWarrantRepository,
    queue: MockNotificationQueue,
) -> RenewalMonitor<MockWarrantRepository, MockNotificationQueue> {
    RenewalMonitor::new(
        Arc::new(warrants),
        Arc::new(queue),
        Arc::new(MutableClock::new(fixed_now())),
    )
}

#[tokio::test]
async fn claimed_overdue_warrant_is_enqueued_once() {
    let warrant = lapsed_warrant();
    let warrant_id = warrant.id;
    let mut warrants = MockWarrantRepository::new();
    warrants
        .expect_list_overdue()
        .return_once(move |_| Ok(vec![warrant]));
    warrants
        .expect_mark_overdue_notified()
        .withf(move |id: &WarrantId| *id == warrant_id)
        .times(1)
        .return_once(|_| Ok(true));
    let mut queue = MockNotificationQueue::new();
    queue
        .expect_enqueue()
        .withf(move |event: &NotificationEvent| {
            event.kind == NotificationKind::Overdue && event.warrant.id == warrant_id
        })
        .times(1)
        .return_once(|_| Ok(()));

    let report = monitor(warrants, queue).tick().await.expect("tick runs");
    assert_eq!(report.alerted, 1);
}

#[tokio::test]
async fn alert_claimed_elsewhere_is_not_enqueued() {
    let warrant = lapsed_warrant();
    let mut warrants = MockWarrantRepository::new();
    warrants
        .expect_list_overdue()
        .return_once(move |_| Ok(vec![warrant]));
    warrants
        .expect_mark_overdue_notified()
        .return_once(|_| Ok(false));
    let mut queue = MockNotificationQueue::new();
    queue.expect_enqueue().times(0);

    let report = monitor(warrants, queue).tick().await.expect("tick runs");
    assert_eq!(
        report,
        MonitorReport {
            overdue: 1,
            alerted: 0,
            skipped: 1,
            failed: 0,
        }
    );
}

#[tokio::test]
async fn one_failing_warrant_does_not_block_the_rest() {
    let first = lapsed_warrant();
    let second = lapsed_warrant();
    let first_id = first.id;
    let mut warrants = MockWarrantRepository::new();
    warrants
        .expect_list_overdue()
        .return_once(move |_| Ok(vec![first, second]));
    warrants
        .expect_mark_overdue_notified()
        .times(2)
        .returning(move |id| {
            if *id == first_id {
                Err(WarrantRepositoryError::connection("timeout"))
            } else {
                Ok(true)
            }
        });
    let mut queue = MockNotificationQueue::new();
    queue.expect_enqueue().times(1).returning(|_| Ok(()));

    let report = monitor(warrants, queue).tick().await.expect("tick runs");
    assert_eq!(report.alerted, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn store_outage_fails_the_tick() {
    let mut warrants = MockWarrantRepository::new();
    warrants
        .expect_list_overdue()
        .return_once(|_| Err(WarrantRepositoryError::connection("refused")));

    let err = monitor(warrants, MockNotificationQueue::new())
        .tick()
        .await
        .expect_err("outage");
    assert!(matches!(err, CanaryError::Unavailable { .. }));
}

#[tokio::test]
async fn reaper_purges_with_current_time() {
    let mut warrants = MockWarrantRepository::new();
    warrants
        .expect_purge_expired_drafts()
        .withf(|now| *now == fixed_now())
        .times(1)
        .return_once(|_| Ok(3));

    let removed = DraftReaper::new(
        Arc::new(warrants),
        Arc::new(MutableClock::new(fixed_now())),
    )
    .purge()
    .await
    .expect("purge runs");
    assert_eq!(removed, 3);
}

#[tokio::test]
async fn alert_lost_to_a_full_queue_is_not_retried() {
    let store = Arc::new(InMemoryCanaryStore::new());
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let issued = fixed_now() - TimeDelta::days(2);
    let draft = Warrant::draft(canary.id, owner.clone(), RenewalOffset::Tomorrow, issued);
    store.insert(&draft).await.expect("insert draft");
    store
        .publish(&draft.id, &owner, &sample_statement(), issued)
        .await
        .expect("publish")
        .expect("draft was open");
    let mut queue = MockNotificationQueue::new();
    queue
        .expect_enqueue()
        .times(1)
        .return_once(|_| Err(NotificationQueueError::full()));
    let monitor = RenewalMonitor::new(
        store,
        Arc::new(queue),
        Arc::new(MutableClock::new(fixed_now())),
    );

    let first = monitor.tick().await.expect("first tick");
    assert_eq!(first.overdue, 1);
    assert_eq!(first.failed, 1);
    let second = monitor.tick().await.expect("second tick");
    assert_eq!(second, MonitorReport::default());
}
