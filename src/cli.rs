use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::str::FromStr;

use crate::chain::LotteryChain;
use crate::config::RunSettings;
use crate::error::{KeeperError, Result};
use crate::keeper::{evaluate, scanner};
use crate::store::{attempt_key, StateStore, CURSOR_KEY, LOCK_KEY};

#[derive(Parser)]
#[command(name = "lotto-keeper")]
#[command(version = "0.1.0")]
#[command(about = "Finalizes expired or sold-out lotteries from an on-chain registry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml / <KEEPER_ENV>.toml
    #[arg(short, long, default_value = "config", global = true)]
    pub config_dir: String,

    /// Simulate finalize calls but never send them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit JSON log lines on the console
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single finalization pass and exit
    Once {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run finalization passes on a fixed interval until interrupted
    Serve {
        /// Seconds between passes (overrides SCHEDULE_INTERVAL_SEC)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show lock and cursor state; evaluate specific lotteries
    Inspect {
        /// Lottery address to evaluate (repeatable)
        #[arg(short, long = "lottery")]
        lotteries: Vec<String>,
    },
    /// Apply database migrations for the PostgreSQL state store
    Migrate,
}

/// Print keeper state and, for each address given, why it would or would
/// not be finalized right now. Read-only: no lock, no attempt records.
pub async fn inspect(
    chain: &dyn LotteryChain,
    store: &dyn StateStore,
    settings: &RunSettings,
    lotteries: &[String],
) -> Result<()> {
    let lock = store.get(LOCK_KEY).await?;
    let cursor = scanner::parse_cursor(store.get(CURSOR_KEY).await?.as_deref());
    let total = chain.lottery_count().await?;
    let plan = scanner::plan(total, cursor, &settings.scan);

    println!("Registry size:  {}", total);
    println!("Lock holder:    {}", lock.as_deref().unwrap_or("-"));
    println!("Cold cursor:    {}", cursor);
    if total > 0 {
        println!(
            "Next scan:      hot [{}..{}) cold [{}..{})",
            plan.hot.start,
            plan.hot.end(),
            plan.cold.start,
            plan.cold.end()
        );
    }

    if lotteries.is_empty() {
        return Ok(());
    }

    let addresses = lotteries
        .iter()
        .map(|raw| {
            Address::from_str(raw.trim())
                .map_err(|e| KeeperError::AddressParsing(format!("{}: {}", raw, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let statuses = chain.statuses(&addresses).await?;
    let details = chain.details(&addresses).await?;
    let now = chrono::Utc::now().timestamp().max(0) as u64;

    for ((address, status), details) in addresses.iter().zip(statuses).zip(details) {
        println!();
        println!("Lottery {}", address);
        println!(
            "  status:   {}",
            status.map(|s| s.to_string()).unwrap_or_else(|| "unreadable".into())
        );

        match details {
            Some(d) => {
                println!("  paused:   {}", d.paused);
                println!("  deadline: {} (now {})", d.deadline, now);
                println!("  sold:     {} / {}", d.sold, d.max_tickets);
                println!("  entropy:  {} provider {}", d.entropy, d.entropy_provider);
                println!("  verdict:  {:?}", evaluate(&d, now, &settings.eligibility));
            }
            None => println!("  details:  unreadable"),
        }

        let attempt = store.get(&attempt_key(address)).await?;
        println!("  attempt:  {}", attempt.as_deref().unwrap_or("-"));
    }

    Ok(())
}
