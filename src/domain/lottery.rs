use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states reported by a lottery contract's `status()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LotteryStatus {
    /// Waiting for the prize pot to be funded
    FundingPending,
    /// Selling tickets
    Open,
    /// Randomness requested, waiting for the oracle callback
    Drawing,
    Completed,
    Canceled,
}

impl LotteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotteryStatus::FundingPending => "FUNDING_PENDING",
            LotteryStatus::Open => "OPEN",
            LotteryStatus::Drawing => "DRAWING",
            LotteryStatus::Completed => "COMPLETED",
            LotteryStatus::Canceled => "CANCELED",
        }
    }
}

impl TryFrom<u8> for LotteryStatus {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(LotteryStatus::FundingPending),
            1 => Ok(LotteryStatus::Open),
            2 => Ok(LotteryStatus::Drawing),
            3 => Ok(LotteryStatus::Completed),
            4 => Ok(LotteryStatus::Canceled),
            other => Err(other),
        }
    }
}

impl fmt::Display for LotteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fresh per-run view of an open lottery, read in one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotteryDetails {
    pub paused: bool,
    /// Unix seconds
    pub deadline: u64,
    pub sold: U256,
    /// 0 = uncapped
    pub max_tickets: u64,
    /// Entropy oracle contract
    pub entropy: Address,
    /// Provider identity passed to the oracle's fee lookup
    pub entropy_provider: Address,
}

impl LotteryDetails {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.deadline
    }

    pub fn is_full(&self) -> bool {
        self.max_tickets > 0 && self.sold >= U256::from(self.max_tickets)
    }
}

/// A lottery that passed the open-status filter together with its details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub address: Address,
    pub details: LotteryDetails,
}
