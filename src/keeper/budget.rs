use tokio::time::Instant;

use crate::config::BudgetConfig;
use crate::domain::BudgetStop;

/// Per-run transaction and wall-clock ceilings.
///
/// Checks are cooperative: they are consulted between units of work and
/// never interrupt a call in flight.
#[derive(Debug, Clone)]
pub struct BudgetGovernor {
    config: BudgetConfig,
    started_at: Instant,
    tx_count: u32,
}

impl BudgetGovernor {
    pub fn new(config: BudgetConfig, started_at: Instant) -> Self {
        Self {
            config,
            started_at,
            tx_count: 0,
        }
    }

    /// The first exhausted ceiling, if any
    pub fn exhausted(&self) -> Option<BudgetStop> {
        if self.tx_count >= self.config.max_tx {
            return Some(BudgetStop::TxLimit);
        }
        if self.started_at.elapsed() > self.config.time_budget {
            return Some(BudgetStop::TimeLimit);
        }
        None
    }

    pub fn record_tx(&mut self) {
        self.tx_count += 1;
    }

    pub fn tx_count(&self) -> u32 {
        self.tx_count
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
