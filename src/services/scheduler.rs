//! Recurring driver for `RunCoordinator::run_once`

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::keeper::{RunCoordinator, RunOutcome};

/// Tick counters, mostly for logs and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub transactions: u64,
}

pub struct Scheduler {
    coordinator: RunCoordinator,
    interval: Duration,
}

impl Scheduler {
    pub fn new(coordinator: RunCoordinator, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// Run one tick every `interval` until `shutdown` flips to true.
    ///
    /// Runs are awaited in place, so a slow run delays the next tick rather
    /// than overlapping it; ticks missed meanwhile are dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting scheduler (interval: {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            stats.ticks += 1;
            self.tick(&mut stats).await;

            if *shutdown.borrow() {
                break;
            }
        }

        info!(
            "Scheduler stopped after {} ticks ({} completed, {} skipped, {} failed, {} txs)",
            stats.ticks, stats.completed, stats.skipped, stats.failed, stats.transactions
        );
        stats
    }

    async fn tick(&self, stats: &mut SchedulerStats) {
        match self.coordinator.store().purge_expired().await {
            Ok(0) => {}
            Ok(n) => debug!("Purged {} expired state entries", n),
            Err(e) => warn!("Failed to purge expired state: {}", e),
        }

        match self.coordinator.run_once().await {
            Ok(RunOutcome::Completed(report)) => {
                stats.completed += 1;
                stats.transactions += report.tx_count() as u64;
            }
            Ok(RunOutcome::Busy { .. }) | Ok(RunOutcome::RaceLost) => stats.skipped += 1,
            Ok(RunOutcome::Failed { .. }) => stats.failed += 1,
            Err(e) => {
                // Lock store unreachable; the lock, if written, expires on its own
                error!("Run aborted: {}", e);
                stats.failed += 1;
            }
        }
    }
}
