use crate::domain::RunId;

use super::budget::BudgetGovernor;
use super::fee_cache::FeeCache;

/// State owned by one run and dropped with it
#[derive(Debug)]
pub struct RunContext {
    pub run_id: RunId,
    pub fees: FeeCache,
    pub budget: BudgetGovernor,
    next_nonce: u64,
}

impl RunContext {
    /// `next_nonce` is the signer's pending transaction count at run start
    pub fn new(run_id: RunId, budget: BudgetGovernor, next_nonce: u64) -> Self {
        Self {
            run_id,
            fees: FeeCache::new(),
            budget,
            next_nonce,
        }
    }

    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Consume the current nonce after a transaction was accepted
    pub fn advance_nonce(&mut self) -> u64 {
        let used = self.next_nonce;
        self.next_nonce += 1;
        used
    }
}
