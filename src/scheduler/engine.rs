//! Scheduler engine implementation.
//!
//! A single timer loop computes the next matching instant, sleeps until it,
//! and spawns the job as an independent task. The loop never awaits a
//! spawned job, so a slow run cannot delay the next firing and firings may
//! overlap. Missed instants (process suspended, long stall) are not
//! replayed: after waking, the next instant is computed from the current
//! time.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::schedule::Schedule;

/// Timer-driven dispatcher for one job
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    /// Start firing `job` at every matching instant, in local time.
    ///
    /// Runs until the process exits. The returned handle completes only if
    /// the schedule can never match again.
    pub fn start<F, Fut>(self, job: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move { self.run_loop(job).await })
    }

    async fn run_loop<F, Fut>(self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut last_fire: Option<DateTime<Local>> = None;

        loop {
            let now = Local::now();
            // Never fire the same instant twice, even if the wall clock reads
            // slightly behind the timer that woke us.
            let from = match last_fire {
                Some(last) if last > now => last,
                _ => now,
            };

            let Some(next) = self.schedule.next_after(&from) else {
                warn!(
                    "Schedule '{}' has no further occurrences, scheduler stopping",
                    self.schedule.expression()
                );
                return;
            };

            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            debug!("Next firing at {} (in {:?})", next.format("%Y-%m-%d %H:%M:%S"), wait);
            tokio::time::sleep(wait).await;

            last_fire = Some(next);
            tokio::spawn(job());
        }
    }
}
