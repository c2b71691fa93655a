//! Scheduled jobs over the warrant store: overdue detection and draft
//! expiry.
//!
//! The monitor only alerts on canaries that have an active warrant whose
//! deadline has passed. Each warrant alerts at most once: the monitor claims
//! the alert with a conditional write before enqueueing, so overlapping
//! ticks or replicas cannot both dispatch it.
//!
//! The claim is not rolled back when the enqueue fails. An alert that finds
//! the notification queue full or closed is logged at `error` and counted as
//! failed, and later ticks do not retry it. Size `fanout_queue_capacity` for
//! the largest expected burst of overdue warrants plus publishes.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{error, info, warn};

use crate::domain::port_error_mapping::map_warrant_error;
use crate::domain::ports::{NotificationQueue, WarrantRepository};
use crate::domain::scheduler::ScheduledJob;
use crate::domain::{CanaryError, NotificationEvent, PublishedWarrant, Warrant};

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Overdue warrants observed.
    pub overdue: usize,
    /// Alerts claimed and enqueued.
    pub alerted: usize,
    /// Alerts already claimed elsewhere.
    pub skipped: usize,
    /// Warrants whose evaluation failed.
    pub failed: usize,
}

/// Renewal monitor emitting one overdue event per lapsed warrant.
pub struct RenewalMonitor<W, Q> {
    warrants: Arc<W>,
    queue: Arc<Q>,
    clock: Arc<dyn Clock>,
}

impl<W, Q> RenewalMonitor<W, Q> {
    /// Create a monitor over the warrant store and notification queue.
    pub fn new(warrants: Arc<W>, queue: Arc<Q>, clock: Arc<dyn Clock>) -> Self {
        Self {
            warrants,
            queue,
            clock,
        }
    }
}

enum Evaluation {
    Alerted,
    Skipped,
}

impl<W, Q> RenewalMonitor<W, Q>
where
    W: WarrantRepository,
    Q: NotificationQueue,
{
    /// Scan the store once.
    ///
    /// # Errors
    /// Only a failure to list overdue warrants fails the tick; failures for
    /// individual warrants are logged and counted.
    pub async fn tick(&self) -> Result<MonitorReport, CanaryError> {
        let now = self.clock.utc();
        let overdue = self
            .warrants
            .list_overdue(now)
            .await
            .map_err(map_warrant_error)?;

        let mut report = MonitorReport {
            overdue: overdue.len(),
            ..MonitorReport::default()
        };
        for warrant in overdue {
            if !warrant.needs_overdue_alert(now) {
                report.skipped += 1;
                continue;
            }
            let warrant_id = warrant.id;
            let canary_id = warrant.canary_id;
            match self.evaluate(warrant).await {
                Ok(Evaluation::Alerted) => report.alerted += 1,
                Ok(Evaluation::Skipped) => report.skipped += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(%canary_id, %warrant_id, %error, "overdue evaluation failed");
                }
            }
        }
        if report.overdue > 0 {
            info!(
                overdue = report.overdue,
                alerted = report.alerted,
                skipped = report.skipped,
                failed = report.failed,
                "renewal monitor tick"
            );
        }
        Ok(report)
    }

    async fn evaluate(&self, warrant: Warrant) -> Result<Evaluation, CanaryError> {
        let claimed = self
            .warrants
            .mark_overdue_notified(&warrant.id)
            .await
            .map_err(map_warrant_error)?;
        if !claimed {
            return Ok(Evaluation::Skipped);
        }

        let warrant_id = warrant.id;
        let owner = warrant.owner.clone();
        let snapshot = PublishedWarrant::try_from(warrant)?;
        if let Err(queue_error) = self.queue.enqueue(NotificationEvent::overdue(owner, snapshot)) {
            error!(%warrant_id, error = %queue_error, "overdue alert claimed but not enqueued");
            return Err(CanaryError::unavailable(queue_error.to_string()));
        }
        Ok(Evaluation::Alerted)
    }
}

#[async_trait]
impl<W, Q> ScheduledJob for RenewalMonitor<W, Q>
where
    W: WarrantRepository + 'static,
    Q: NotificationQueue + 'static,
{
    fn name(&self) -> &'static str {
        "renewal-monitor"
    }

    async fn run(&self) -> Result<(), CanaryError> {
        self.tick().await.map(|_| ())
    }
}

/// Periodic removal of drafts past their retention window.
///
/// Reads already hide expired drafts; the reaper reclaims their storage.
pub struct DraftReaper<W> {
    warrants: Arc<W>,
    clock: Arc<dyn Clock>,
}

impl<W> DraftReaper<W> {
    /// Create a reaper over the warrant store.
    pub fn new(warrants: Arc<W>, clock: Arc<dyn Clock>) -> Self {
        Self { warrants, clock }
    }
}

impl<W> DraftReaper<W>
where
    W: WarrantRepository,
{
    /// Delete every expired draft, returning how many were removed.
    pub async fn purge(&self) -> Result<u64, CanaryError> {
        let removed = self
            .warrants
            .purge_expired_drafts(self.clock.utc())
            .await
            .map_err(map_warrant_error)?;
        if removed > 0 {
            info!(removed, "expired drafts purged");
        }
        Ok(removed)
    }
}

#[async_trait]
impl<W> ScheduledJob for DraftReaper<W>
where
    W: WarrantRepository + 'static,
{
    fn name(&self) -> &'static str {
        "draft-reaper"
    }

    async fn run(&self) -> Result<(), CanaryError> {
        self.purge().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "renewal_monitor_tests.rs"]
mod tests;
