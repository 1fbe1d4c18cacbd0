use clap::Parser;
use lotto_keeper::cli::{self, Cli, Commands};
use lotto_keeper::config::{KeeperConfig, RawSettings};
use lotto_keeper::error::{KeeperError, Result};
use lotto_keeper::store::PostgresStateStore;
use lotto_keeper::{RunOutcome, Scheduler};
use std::time::Duration;
use tracing::{error, info, warn};

mod main_runtime;

use main_runtime::{
    build_chain, build_coordinator, build_store, init_logging, init_logging_simple,
    shutdown_signal,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Once { json } => {
            init_logging(cli.json_logs);
            let config = load_config(&cli)?;
            run_once(&config, *json).await?;
        }
        Commands::Serve { interval } => {
            init_logging(cli.json_logs);
            let mut config = load_config(&cli)?;
            if let Some(secs) = interval {
                config.schedule_interval = Duration::from_secs((*secs).max(1));
            }
            run_serve(&config).await?;
        }
        Commands::Inspect { lotteries } => {
            init_logging_simple();
            let config = load_config(&cli)?;
            let chain = build_chain(&config)?;
            let store = build_store(config.database_url.as_deref()).await?;
            cli::inspect(&chain, store.as_ref(), &config.run, lotteries).await?;
        }
        Commands::Migrate => {
            init_logging_simple();
            let raw = RawSettings::load_from(&cli.config_dir)?;
            let url = raw
                .database_url
                .filter(|v| !v.trim().is_empty())
                .ok_or(KeeperError::MissingConfig("DATABASE_URL"))?;
            let store = PostgresStateStore::new(&url, 1).await?;
            store.migrate().await?;
            println!("Migrations applied");
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<KeeperConfig> {
    let mut config = KeeperConfig::load_from(&cli.config_dir).map_err(|e| {
        error!("❌ Configuration error: {}", e);
        e
    })?;
    if cli.dry_run {
        config.run.submit.dry_run = true;
    }
    if config.run.submit.dry_run {
        info!("Dry run enabled: finalize calls are simulated only, attempt records go under dry-run:");
        if config.database_url.is_some() {
            warn!("Dry run shares the run lock with live keepers on this database");
        }
    }
    Ok(config)
}

async fn run_once(config: &KeeperConfig, json: bool) -> Result<()> {
    let coordinator = build_coordinator(config).await?;

    match coordinator.run_once().await? {
        RunOutcome::Completed(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        RunOutcome::Busy { holder } => info!("Skipped: previous run {} still holds the lock", holder),
        RunOutcome::RaceLost => info!("Skipped: another run took the lock"),
        RunOutcome::Failed { reason } => {
            return Err(KeeperError::Internal(format!("run failed: {}", reason)));
        }
    }

    Ok(())
}

async fn run_serve(config: &KeeperConfig) -> Result<()> {
    let coordinator = build_coordinator(config).await?;

    let scheduler = Scheduler::new(coordinator, config.schedule_interval);
    let stats = scheduler.run(shutdown_signal()).await;

    info!(
        "Keeper stopped ({} runs completed, {} transactions)",
        stats.completed, stats.transactions
    );
    Ok(())
}
