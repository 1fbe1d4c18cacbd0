use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

use super::lock::{LockAcquire, RunLock};
use super::pipeline::Pipeline;
use crate::chain::LotteryChain;
use crate::config::{tx_url, RunSettings};
use crate::domain::{RunId, RunReport};
use crate::error::Result;
use crate::store::StateStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Lock present when we looked
    Busy { holder: String },
    /// Lost the write/read-back race
    RaceLost,
    Completed(RunReport),
    /// Pipeline error, logged and swallowed
    Failed { reason: String },
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Single-flight entry point for one scheduled tick
pub struct RunCoordinator {
    chain: Arc<dyn LotteryChain>,
    store: Arc<dyn StateStore>,
    settings: RunSettings,
    explorer_url: Option<String>,
}

impl RunCoordinator {
    pub fn new(
        chain: Arc<dyn LotteryChain>,
        store: Arc<dyn StateStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            chain,
            store,
            settings,
            explorer_url: None,
        }
    }

    /// Log explorer links for sent transactions
    pub fn with_explorer(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = Some(explorer_url.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Acquire the lock, run the pipeline, release the lock if still ours.
    ///
    /// Pipeline failures become `RunOutcome::Failed`. Only state-store
    /// failures while taking or releasing the lock surface as `Err`.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id);
        self.run_with_id(run_id).instrument(span).await
    }

    async fn run_with_id(&self, run_id: RunId) -> Result<RunOutcome> {
        let started_at = Instant::now();
        info!("🤖 Run {} started", run_id);

        let lock = match RunLock::acquire(self.store.as_ref(), &run_id, self.settings.lock_ttl).await? {
            LockAcquire::Acquired(lock) => lock,
            LockAcquire::Held { holder } => return Ok(RunOutcome::Busy { holder }),
            LockAcquire::RaceLost { .. } => return Ok(RunOutcome::RaceLost),
        };

        let pipeline = Pipeline::new(self.chain.as_ref(), self.store.as_ref(), self.settings);
        let outcome = match pipeline.run(&run_id, started_at).await {
            Ok(report) => {
                self.log_links(&report);
                RunOutcome::Completed(report)
            }
            Err(e) => {
                error!("❌ Critical Error: {}", e);
                RunOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        lock.release().await?;
        Ok(outcome)
    }

    fn log_links(&self, report: &RunReport) {
        let Some(explorer) = self.explorer_url.as_deref() else {
            return;
        };
        for tx in &report.submitted {
            info!("   {} → {}", tx.lottery, tx_url(explorer, tx.tx_hash));
        }
    }
}
