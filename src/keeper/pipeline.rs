//! Scan → filter → evaluate → submit for one run

use alloy::primitives::Address;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::budget::BudgetGovernor;
use super::context::RunContext;
use super::eligibility::{evaluate, is_open, Verdict};
use super::scanner::RegistryScanner;
use super::submitter::{SubmitOutcome, TransactionSubmitter};
use crate::chain::LotteryChain;
use crate::config::RunSettings;
use crate::domain::{Candidate, RunId, RunReport, SubmittedTx};
use crate::error::Result;
use crate::store::StateStore;

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

pub struct Pipeline<'a> {
    chain: &'a dyn LotteryChain,
    store: &'a dyn StateStore,
    settings: RunSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(chain: &'a dyn LotteryChain, store: &'a dyn StateStore, settings: RunSettings) -> Self {
        Self {
            chain,
            store,
            settings,
        }
    }

    /// Run one pass. The cold cursor is persisted only once processing is
    /// over, so an error before that point rescans the same segment.
    pub async fn run(&self, run_id: &RunId, started_at: Instant) -> Result<RunReport> {
        let budget = BudgetGovernor::new(self.settings.budget, started_at);
        let scanner = RegistryScanner::new(self.chain, self.store, self.settings.scan);
        let mut report = RunReport::default();

        let Some(scan) = scanner.scan().await? else {
            report.elapsed_ms = budget.elapsed_ms();
            return Ok(report);
        };
        report.total = scan.plan.total;
        report.candidates = scan.candidates.len();
        report.next_cursor = Some(scan.plan.next_cursor);

        let open = if scan.candidates.is_empty() {
            info!("No candidates");
            Vec::new()
        } else {
            self.open_lotteries(&scan.candidates).await?
        };
        report.open = open.len();

        if open.is_empty() {
            if report.candidates > 0 {
                info!("No open lotteries found");
            }
        } else {
            info!("⚡ Found {} open lotteries to analyze", open.len());
            let next_nonce = self.chain.pending_nonce().await?;
            let mut ctx = RunContext::new(run_id.clone(), budget.clone(), next_nonce);
            self.process(&open, &mut ctx, &mut report).await?;
        }

        scanner.commit(&scan.plan).await?;
        report.elapsed_ms = budget.elapsed_ms();

        info!(
            "🏁 Run complete. txCount={} cursor={} elapsed={}ms",
            report.tx_count(),
            scan.plan.next_cursor,
            report.elapsed_ms
        );
        Ok(report)
    }

    async fn open_lotteries(&self, candidates: &[Address]) -> Result<Vec<Address>> {
        let statuses = self.chain.statuses(candidates).await?;

        Ok(candidates
            .iter()
            .zip(statuses)
            .filter(|(_, status)| is_open(*status))
            .map(|(address, _)| *address)
            .collect())
    }

    async fn process(
        &self,
        open: &[Address],
        ctx: &mut RunContext,
        report: &mut RunReport,
    ) -> Result<()> {
        let submitter = TransactionSubmitter::new(self.chain, self.store, self.settings.submit);

        for chunk in open.chunks(self.settings.scan.chunk_size) {
            if let Some(stop) = ctx.budget.exhausted() {
                info!("Budget reached ({}), stopping", stop);
                report.budget_stop = Some(stop);
                break;
            }

            let now = unix_now();
            let details = self.chain.details(chunk).await?;

            for (address, details) in chunk.iter().zip(details) {
                if let Some(stop) = ctx.budget.exhausted() {
                    info!("Budget reached ({}), stopping", stop);
                    report.budget_stop = Some(stop);
                    return Ok(());
                }

                let Some(details) = details else {
                    debug!(lottery = %address, "Detail read incomplete, skipping");
                    report.unreadable += 1;
                    continue;
                };

                let (expired, full) = match evaluate(&details, now, &self.settings.eligibility) {
                    Verdict::Eligible { expired, full } => (expired, full),
                    verdict => {
                        debug!(lottery = %address, ?verdict, "Not eligible");
                        continue;
                    }
                };
                report.eligible += 1;

                info!(
                    "🚀 Finalizing eligible lottery: {} (expired={} full={} sold={} max={})",
                    address, expired, full, details.sold, details.max_tickets
                );

                let candidate = Candidate {
                    address: *address,
                    details,
                };
                let outcome = submitter.submit(&candidate, ctx).await?;
                self.record(&candidate, outcome, ctx, report);
            }
        }

        Ok(())
    }

    fn record(
        &self,
        candidate: &Candidate,
        outcome: SubmitOutcome,
        ctx: &mut RunContext,
        report: &mut RunReport,
    ) {
        match outcome {
            SubmitOutcome::Submitted {
                tx_hash,
                nonce,
                value,
                fee_refreshed,
            } => {
                info!(
                    lottery = %candidate.address,
                    nonce,
                    fee_refreshed,
                    "✅ Tx Sent: {}",
                    tx_hash
                );
                ctx.budget.record_tx();
                report.submitted.push(SubmittedTx {
                    lottery: candidate.address,
                    tx_hash,
                    nonce,
                    value: value.to_string(),
                });
            }
            SubmitOutcome::DryRun { .. } => {
                // Counted against the budget so a dry run mirrors a live one
                ctx.budget.record_tx();
                report.dry_run += 1;
            }
            SubmitOutcome::SkippedRecentAttempt => report.skipped_recent_attempt += 1,
            SubmitOutcome::SimulationRejected { .. } => report.simulation_rejected += 1,
            SubmitOutcome::SendFailed { reason } => {
                warn!(lottery = %candidate.address, "⏭️ Finalize not sent: {}", reason);
                report.send_failed += 1;
            }
        }
    }
}
