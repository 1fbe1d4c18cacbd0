//! Finalization eligibility
//!
//! Stage one keeps lotteries whose status is `Open`; stage two looks at the
//! detail snapshot. Both are pure so the same inputs always decide the same way.

use alloy::primitives::U256;

use crate::config::EligibilityPolicy;
use crate::domain::{LotteryDetails, LotteryStatus};

/// Stage-one filter. An unreadable status is never actionable.
pub fn is_open(status: Option<LotteryStatus>) -> bool {
    status == Some(LotteryStatus::Open)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible { expired: bool, full: bool },
    Paused,
    /// Excluded by the zero-sold policy
    NothingSold,
    /// Still running and not sold out
    NotYet,
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible { .. })
    }
}

pub fn evaluate(details: &LotteryDetails, now: u64, policy: &EligibilityPolicy) -> Verdict {
    if details.paused {
        return Verdict::Paused;
    }

    if policy.skip_zero_sold && details.sold == U256::ZERO {
        return Verdict::NothingSold;
    }

    let expired = details.is_expired(now);
    let full = details.is_full();

    if expired || full {
        Verdict::Eligible { expired, full }
    } else {
        Verdict::NotYet
    }
}

/// Expired or sold out, and not paused
pub fn is_eligible(details: &LotteryDetails, now: u64) -> bool {
    evaluate(details, now, &EligibilityPolicy::default()).is_eligible()
}
