//! Fixed-cadence background scheduler.
//!
//! Each registered job gets its own loop. A run executes on a fresh task so
//! an error or panic is logged and the loop carries on with the next tick.
//! Runs of the same job never overlap; late ticks are skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::domain::CanaryError;

/// Work the scheduler runs on a fixed interval.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Execute one run.
    async fn run(&self) -> Result<(), CanaryError>;
}

/// Builder collecting jobs and their periods.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<(Arc<dyn ScheduledJob>, Duration)>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` every `period`. The first run happens immediately.
    #[must_use]
    pub fn every(mut self, period: Duration, job: Arc<dyn ScheduledJob>) -> Self {
        self.jobs.push((job, period));
        self
    }

    /// Spawn one loop per job on the current runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, signal) = watch::channel(false);
        let tasks = self
            .jobs
            .into_iter()
            .map(|(job, period)| tokio::spawn(run_job(job, period, signal.clone())))
            .collect();
        SchedulerHandle { shutdown, tasks }
    }
}

async fn run_job(job: Arc<dyn ScheduledJob>, period: Duration, mut signal: watch::Receiver<bool>) {
    let name = job.name();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(job = name, period_secs = period.as_secs(), "scheduled job started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = signal.changed() => {
                if changed.is_err() || *signal.borrow() {
                    break;
                }
                continue;
            }
        }

        let run = Arc::clone(&job);
        match tokio::spawn(async move { run.run().await }).await {
            Ok(Ok(())) => debug!(job = name, "scheduled job run finished"),
            Ok(Err(err)) => warn!(job = name, error = %err, "scheduled job run failed"),
            Err(join_error) => error!(job = name, error = %join_error, "scheduled job run aborted"),
        }
    }
    info!(job = name, "scheduled job stopped");
}

/// Running scheduler; dropping it leaves the loops running until the
/// runtime shuts down.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Ask every loop to stop after its current run and wait for them.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("scheduler loops already stopped");
        }
        for task in self.tasks {
            if let Err(join_error) = task.await {
                warn!(error = %join_error, "scheduler loop ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ScheduledJob for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self) -> Result<(), CanaryError> {
            let previous = self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CanaryError::unavailable("store offline"));
            }
            if previous == 1 {
                panic!("second run panics");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_and_panicking_runs_do_not_stop_the_loop() {
        for fail in [false, true] {
            let job = Arc::new(Counting {
                runs: AtomicUsize::new(0),
                fail,
            });
            let handle = Scheduler::new()
                .every(Duration::from_secs(60), job.clone())
                .start();

            for _ in 0..4 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            handle.shutdown().await;

            assert!(job.runs.load(Ordering::SeqCst) >= 4);
        }
    }
}
