//! Idempotent finalize submission
//!
//! An attempt record is written before anything touches the chain. A crash or
//! a host kill after that point costs one TTL window of retries, never a
//! second finalize fee.

use alloy::primitives::{TxHash, U256};
use tracing::{debug, info, warn};

use super::context::RunContext;
use super::fee_cache::{apply_markup, FeeKey};
use crate::chain::LotteryChain;
use crate::config::SubmitConfig;
use crate::domain::Candidate;
use crate::error::Result;
use crate::store::{attempt_key, dry_run_attempt_key, StateStore};

/// Whether a simulation failure means the attached fee went stale.
///
/// Substring heuristic over the node's message; matches both the custom
/// error name (`InsufficientFee`) and prose forms.
pub fn is_stale_fee_error(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("insufficient fee") || message.contains("insufficientfee")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted {
        tx_hash: TxHash,
        nonce: u64,
        value: U256,
        /// Simulation only passed after a fee refresh
        fee_refreshed: bool,
    },
    /// Simulation passed; sending disabled
    DryRun { value: U256 },
    /// A live attempt record exists for this lottery
    SkippedRecentAttempt,
    /// Terminal for this lottery in this run
    SimulationRejected { reason: String },
    /// Fee read or broadcast failed after the attempt was recorded
    SendFailed { reason: String },
}

pub struct TransactionSubmitter<'a> {
    chain: &'a dyn LotteryChain,
    store: &'a dyn StateStore,
    config: SubmitConfig,
}

impl<'a> TransactionSubmitter<'a> {
    pub fn new(
        chain: &'a dyn LotteryChain,
        store: &'a dyn StateStore,
        config: SubmitConfig,
    ) -> Self {
        Self {
            chain,
            store,
            config,
        }
    }

    /// Attempt to finalize an eligible lottery.
    ///
    /// Only state-store failures are returned as errors; everything that
    /// goes wrong on the chain side is folded into the outcome.
    pub async fn submit(&self, candidate: &Candidate, ctx: &mut RunContext) -> Result<SubmitOutcome> {
        // Dry runs keep their own records so they never hold back a live run
        let key = if self.config.dry_run {
            dry_run_attempt_key(&candidate.address)
        } else {
            attempt_key(&candidate.address)
        };

        if self.store.get(&key).await?.is_some() {
            debug!(lottery = %candidate.address, "Recently attempted, skipping");
            return Ok(SubmitOutcome::SkippedRecentAttempt);
        }

        let marked_at = chrono::Utc::now().timestamp_millis().to_string();
        self.store
            .put(&key, &marked_at, Some(self.config.attempt_ttl))
            .await?;

        Ok(self.finalize(candidate, ctx).await)
    }

    async fn finalize(&self, candidate: &Candidate, ctx: &mut RunContext) -> SubmitOutcome {
        let lottery = candidate.address;
        let fee_key = FeeKey::new(candidate.details.entropy, candidate.details.entropy_provider);

        let fee = match ctx.fees.resolve(self.chain, fee_key).await {
            Ok(fee) => fee,
            Err(e) => {
                warn!(%lottery, "Fee lookup failed: {}", e);
                return SubmitOutcome::SendFailed {
                    reason: e.to_string(),
                };
            }
        };

        let mut value = apply_markup(fee, self.config.fee_markup_bps);
        let mut fee_refreshed = false;

        if let Err(err) = self.chain.simulate_finalize(lottery, value).await {
            if !is_stale_fee_error(&err.message) {
                warn!(%lottery, "Simulation failed: {}", err);
                return SubmitOutcome::SimulationRejected {
                    reason: err.message,
                };
            }

            info!(%lottery, "Fee went stale ({}), refreshing", err);
            let refreshed = match ctx.fees.refresh(self.chain, fee_key).await {
                Ok(fee) => fee,
                Err(e) => {
                    warn!(%lottery, "Fee refresh failed: {}", e);
                    return SubmitOutcome::SendFailed {
                        reason: e.to_string(),
                    };
                }
            };

            value = apply_markup(refreshed, self.config.fee_markup_bps);
            fee_refreshed = true;

            if let Err(err) = self.chain.simulate_finalize(lottery, value).await {
                warn!(%lottery, "Simulation failed after fee refresh: {}", err);
                return SubmitOutcome::SimulationRejected {
                    reason: err.message,
                };
            }
        }

        if self.config.dry_run {
            info!(%lottery, %value, "[DRY RUN] Would finalize");
            return SubmitOutcome::DryRun { value };
        }

        let nonce = ctx.next_nonce();
        match self.chain.send_finalize(lottery, value, nonce).await {
            Ok(tx_hash) => {
                ctx.advance_nonce();
                SubmitOutcome::Submitted {
                    tx_hash,
                    nonce,
                    value,
                    fee_refreshed,
                }
            }
            Err(e) => {
                // Attempt record stays until its TTL runs out
                warn!(%lottery, nonce, "Tx failed: {}", e);
                SubmitOutcome::SendFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_fee_classification() {
        assert!(is_stale_fee_error("InsufficientFee: need 120, got 100"));
        assert!(is_stale_fee_error("execution reverted: Insufficient Fee"));
        assert!(is_stale_fee_error("INSUFFICIENT FEE"));
        assert!(is_stale_fee_error(
            "server returned an error response: error code 3: execution reverted: insufficientfee()"
        ));

        assert!(!is_stale_fee_error("execution reverted: NotOpen"));
        assert!(!is_stale_fee_error("insufficient funds for gas * price + value"));
        assert!(!is_stale_fee_error(""));
    }
}
