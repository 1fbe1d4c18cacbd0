use lotto_keeper::chain::RpcChain;
use lotto_keeper::error::Result;
use lotto_keeper::store::{MemoryStore, PostgresStateStore, StateStore};
use lotto_keeper::{KeeperConfig, KeeperWallet, RunCoordinator};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DB_MAX_CONNECTIONS: u32 = 5;

pub fn init_logging(json: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lotto_keeper=debug,sqlx=warn"));

    // Prefer KEEPER_LOG_DIR, fall back to LOG_DIR, else console only.
    let log_dir = std::env::var("KEEPER_LOG_DIR")
        .or_else(|_| std::env::var("LOG_DIR"))
        .ok();

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so preflight writability first.
    let file_layer = log_dir.as_deref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                log_dir, e
            );
            return None;
        }

        let test_path = std::path::Path::new(log_dir).join(".keeper_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(log_dir, "lotto-keeper.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let (plain, structured) = if json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/lotto-keeper.log", dir);
    }
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise an in-process store.
pub async fn build_store(database_url: Option<&str>) -> Result<Arc<dyn StateStore>> {
    match database_url {
        Some(url) => {
            let store = PostgresStateStore::new(url, DB_MAX_CONNECTIONS).await?;
            store.migrate().await?;
            info!("Using PostgreSQL state store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory state (lock is per-process only)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn build_chain(config: &KeeperConfig) -> Result<RpcChain> {
    let wallet = KeeperWallet::from_signing_key(&config.signing_key, config.chain.chain_id)?;
    info!(
        "Keeper wallet {} on chain {} via {}",
        wallet.address(),
        config.chain.chain_id,
        config.chain.rpc_url
    );
    Ok(RpcChain::connect(&config.chain, &wallet))
}

pub async fn build_coordinator(config: &KeeperConfig) -> Result<RunCoordinator> {
    let chain = Arc::new(build_chain(config)?);
    let store = build_store(config.database_url.as_deref()).await?;
    Ok(RunCoordinator::new(chain, store, config.run).with_explorer(config.chain.explorer_url.clone()))
}

/// Flip the returned receiver to `true` on Ctrl-C or SIGTERM
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("Shutdown requested, finishing current run");
        let _ = tx.send(true);
    });

    rx
}
