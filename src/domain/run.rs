use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token identifying one invocation; doubles as the lock value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RunId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the processing loop stopped before running out of candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStop {
    TxLimit,
    TimeLimit,
}

impl fmt::Display for BudgetStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStop::TxLimit => write!(f, "tx limit"),
            BudgetStop::TimeLimit => write!(f, "time limit"),
        }
    }
}

/// A finalize transaction accepted by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTx {
    pub lottery: Address,
    pub tx_hash: TxHash,
    pub nonce: u64,
    /// Value attached, in wei
    pub value: String,
}

/// Summary of one completed scan/submit pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub total: u64,
    pub candidates: usize,
    pub open: usize,
    pub eligible: usize,
    pub submitted: Vec<SubmittedTx>,
    pub dry_run: usize,
    pub skipped_recent_attempt: usize,
    pub simulation_rejected: usize,
    pub send_failed: usize,
    pub unreadable: usize,
    /// None when the registry was empty and no cursor was touched
    pub next_cursor: Option<u64>,
    pub budget_stop: Option<BudgetStop>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn tx_count(&self) -> usize {
        self.submitted.len()
    }
}
