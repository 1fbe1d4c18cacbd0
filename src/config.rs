use alloy::primitives::Address;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::{KeeperError, Result};

pub const DEFAULT_RPC_URL: &str = "https://node.mainnet.etherlink.com";
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.etherlink.com";
/// Etherlink mainnet
pub const DEFAULT_CHAIN_ID: u64 = 42793;
/// Canonical Multicall3 deployment, same address on every EVM chain that has it
pub const DEFAULT_MULTICALL_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

/// (default, hard cap) pairs for the numeric knobs
const HOT_SIZE: (u64, u64) = (100, 500);
const COLD_SIZE: (u64, u64) = (50, 200);
const CHUNK_SIZE: (u64, u64) = (25, 100);
const MAX_TX: (u64, u64) = (5, 25);
const TIME_BUDGET_MS: (u64, u64) = (25_000, 45_000);
const ATTEMPT_TTL_SEC: (u64, u64) = (600, 3_600);
const LOCK_TTL_SEC: (u64, u64) = (180, 900);
const FEE_MARKUP_BPS: (u64, u64) = (0, 5_000);
const SCHEDULE_INTERVAL_SEC: (u64, u64) = (60, 86_400);
/// Shortest TTL written to the state store. A zero TTL would write records
/// that are already expired, disabling both the lock and attempt records.
pub const MIN_TTL_SEC: u64 = 60;

/// Raw settings as they arrive from files and the environment.
///
/// Every field is a string so that a malformed number can fall back to its
/// default instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub bot_private_key: Option<String>,
    pub registry_address: Option<String>,
    pub rpc_url: Option<String>,
    pub chain_id: Option<String>,
    pub multicall_address: Option<String>,
    pub explorer_url: Option<String>,
    pub hot_size: Option<String>,
    pub cold_size: Option<String>,
    pub chunk_size: Option<String>,
    pub max_tx: Option<String>,
    pub time_budget_ms: Option<String>,
    pub attempt_ttl_sec: Option<String>,
    pub lock_ttl_sec: Option<String>,
    pub fee_markup_bps: Option<String>,
    pub skip_zero_sold: Option<String>,
    pub dry_run: Option<String>,
    pub database_url: Option<String>,
    pub schedule_interval_sec: Option<String>,
}

impl RawSettings {
    /// Load settings from `<dir>/default.toml`, `<dir>/<KEEPER_ENV>.toml` and
    /// the process environment (unprefixed, e.g. `HOT_SIZE`).
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let settings = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(
                    std::env::var("KEEPER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            .add_source(Environment::default().try_parsing(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Signing key held only until the signer is built
pub struct SigningKey(Zeroizing<String>);

impl SigningKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: url::Url,
    pub chain_id: u64,
    pub registry: Address,
    pub multicall: Address,
    pub explorer_url: String,
}

/// Explorer page for a transaction
pub fn tx_url(explorer_url: &str, tx_hash: impl std::fmt::Display) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), tx_hash)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Most recent registry entries rescanned every run
    pub hot_size: u64,
    /// Entries visited per run from the persisted cursor
    pub cold_size: u64,
    /// Candidates per batched detail read
    pub chunk_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            hot_size: HOT_SIZE.0,
            cold_size: COLD_SIZE.0,
            chunk_size: CHUNK_SIZE.0 as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetConfig {
    pub max_tx: u32,
    pub time_budget: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tx: MAX_TX.0 as u32,
            time_budget: Duration::from_millis(TIME_BUDGET_MS.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitConfig {
    pub attempt_ttl: Duration,
    /// Extra value attached on top of the oracle fee, in basis points
    pub fee_markup_bps: u32,
    /// Simulate but never send
    pub dry_run: bool,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            attempt_ttl: Duration::from_secs(ATTEMPT_TTL_SEC.0),
            fee_markup_bps: FEE_MARKUP_BPS.0 as u32,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityPolicy {
    /// Leave lotteries with no tickets sold alone
    pub skip_zero_sold: bool,
}

/// Settings that drive a single run, independent of how the chain is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub scan: ScanConfig,
    pub budget: BudgetConfig,
    pub submit: SubmitConfig,
    pub eligibility: EligibilityPolicy,
    pub lock_ttl: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            budget: BudgetConfig::default(),
            submit: SubmitConfig::default(),
            eligibility: EligibilityPolicy::default(),
            lock_ttl: Duration::from_secs(LOCK_TTL_SEC.0),
        }
    }
}

/// Validated keeper configuration
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    pub signing_key: SigningKey,
    pub chain: ChainConfig,
    pub run: RunSettings,
    pub database_url: Option<String>,
    pub schedule_interval: Duration,
}

impl KeeperConfig {
    /// Load configuration from the `config` directory and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::from_settings(RawSettings::load_from(config_dir)?)
    }

    /// Apply defaults, caps and required-field checks to raw settings
    pub fn from_settings(raw: RawSettings) -> Result<Self> {
        let signing_key = non_empty(raw.bot_private_key.as_deref())
            .map(SigningKey::new)
            .ok_or(KeeperError::MissingConfig("BOT_PRIVATE_KEY"))?;

        let registry = non_empty(raw.registry_address.as_deref())
            .ok_or(KeeperError::MissingConfig("REGISTRY_ADDRESS"))
            .and_then(|v| parse_address("REGISTRY_ADDRESS", v))?;

        let multicall = parse_address(
            "MULTICALL_ADDRESS",
            non_empty(raw.multicall_address.as_deref()).unwrap_or(DEFAULT_MULTICALL_ADDRESS),
        )?;

        let rpc_url = non_empty(raw.rpc_url.as_deref()).unwrap_or(DEFAULT_RPC_URL);
        let rpc_url = url::Url::parse(rpc_url).map_err(|e| KeeperError::InvalidConfig {
            key: "RPC_URL",
            reason: e.to_string(),
        })?;

        let chain_id = raw
            .chain_id
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        let explorer_url = non_empty(raw.explorer_url.as_deref())
            .unwrap_or(DEFAULT_EXPLORER_URL)
            .to_string();

        let run = RunSettings {
            scan: ScanConfig {
                hot_size: safe_int(raw.hot_size.as_deref(), HOT_SIZE),
                cold_size: safe_int(raw.cold_size.as_deref(), COLD_SIZE),
                // A zero chunk size would never make progress
                chunk_size: safe_int(raw.chunk_size.as_deref(), CHUNK_SIZE).max(1) as usize,
            },
            budget: BudgetConfig {
                max_tx: safe_int(raw.max_tx.as_deref(), MAX_TX) as u32,
                time_budget: Duration::from_millis(safe_int(
                    raw.time_budget_ms.as_deref(),
                    TIME_BUDGET_MS,
                )),
            },
            submit: SubmitConfig {
                attempt_ttl: Duration::from_secs(
                    safe_int(raw.attempt_ttl_sec.as_deref(), ATTEMPT_TTL_SEC).max(MIN_TTL_SEC),
                ),
                fee_markup_bps: safe_int(raw.fee_markup_bps.as_deref(), FEE_MARKUP_BPS) as u32,
                dry_run: safe_bool(raw.dry_run.as_deref(), false),
            },
            eligibility: EligibilityPolicy {
                skip_zero_sold: safe_bool(raw.skip_zero_sold.as_deref(), false),
            },
            lock_ttl: Duration::from_secs(
                safe_int(raw.lock_ttl_sec.as_deref(), LOCK_TTL_SEC).max(MIN_TTL_SEC),
            ),
        };

        Ok(Self {
            signing_key,
            chain: ChainConfig {
                rpc_url,
                chain_id,
                registry,
                multicall,
                explorer_url,
            },
            run,
            database_url: non_empty(raw.database_url.as_deref()).map(ToString::to_string),
            schedule_interval: Duration::from_secs(
                safe_int(raw.schedule_interval_sec.as_deref(), SCHEDULE_INTERVAL_SEC).max(1),
            ),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_address(key: &'static str, raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| KeeperError::InvalidConfig {
        key,
        reason: format!("{raw:?} is not an address: {e}"),
    })
}

/// Lenient integer parsing: missing or non-numeric input yields the default,
/// fractions are floored, negatives become zero and values above the cap are
/// clamped.
pub fn safe_int(raw: Option<&str>, (default, cap): (u64, u64)) -> u64 {
    let Some(raw) = non_empty(raw) else {
        return default;
    };

    if let Ok(n) = raw.parse::<i128>() {
        return n.clamp(0, cap as i128) as u64;
    }

    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => n.floor().clamp(0.0, cap as f64) as u64,
        _ => default,
    }
}

pub fn safe_bool(raw: Option<&str>, default: bool) -> bool {
    match non_empty(raw).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "y" | "on") => true,
        Some("0" | "false" | "no" | "n" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawSettings {
        RawSettings {
            bot_private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
            ),
            registry_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_safe_int_defaults_and_caps() {
        assert_eq!(safe_int(None, (100, 500)), 100);
        assert_eq!(safe_int(Some(""), (100, 500)), 100);
        assert_eq!(safe_int(Some("  "), (100, 500)), 100);
        assert_eq!(safe_int(Some("abc"), (100, 500)), 100);
        assert_eq!(safe_int(Some("NaN"), (100, 500)), 100);
        assert_eq!(safe_int(Some("inf"), (100, 500)), 100);
        assert_eq!(safe_int(Some("250"), (100, 500)), 250);
        assert_eq!(safe_int(Some("9000"), (100, 500)), 500);
        assert_eq!(safe_int(Some("12.9"), (100, 500)), 12);
        assert_eq!(safe_int(Some("-4"), (100, 500)), 0);
        assert_eq!(
            safe_int(Some("99999999999999999999999999999999999999999"), (100, 500)),
            500
        );
    }

    #[test]
    fn test_safe_bool() {
        assert!(safe_bool(Some("true"), false));
        assert!(safe_bool(Some(" YES "), false));
        assert!(!safe_bool(Some("0"), true));
        assert!(safe_bool(Some("maybe"), true));
        assert!(!safe_bool(None, false));
    }

    #[test]
    fn test_defaults_applied() {
        let config = KeeperConfig::from_settings(minimal()).unwrap();

        assert_eq!(config.run, RunSettings::default());
        assert_eq!(config.run.scan.hot_size, 100);
        assert_eq!(config.run.scan.cold_size, 50);
        assert_eq!(config.run.scan.chunk_size, 25);
        assert_eq!(config.run.budget.max_tx, 5);
        assert_eq!(config.run.budget.time_budget, Duration::from_millis(25_000));
        assert_eq!(config.run.submit.attempt_ttl, Duration::from_secs(600));
        assert_eq!(config.run.lock_ttl, Duration::from_secs(180));
        assert_eq!(config.chain.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.chain.rpc_url.as_str(), "https://node.mainnet.etherlink.com/");
        assert!(config.database_url.is_none());
        assert_eq!(config.schedule_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_are_clamped() {
        let raw = RawSettings {
            hot_size: Some("10000".into()),
            cold_size: Some("oops".into()),
            chunk_size: Some("0".into()),
            max_tx: Some("30".into()),
            time_budget_ms: Some("60000".into()),
            attempt_ttl_sec: Some("7200".into()),
            fee_markup_bps: Some("2000".into()),
            skip_zero_sold: Some("true".into()),
            dry_run: Some("1".into()),
            ..minimal()
        };

        let config = KeeperConfig::from_settings(raw).unwrap();

        assert_eq!(config.run.scan.hot_size, 500);
        assert_eq!(config.run.scan.cold_size, 50);
        assert_eq!(config.run.scan.chunk_size, 1);
        assert_eq!(config.run.budget.max_tx, 25);
        assert_eq!(config.run.budget.time_budget, Duration::from_millis(45_000));
        assert_eq!(config.run.submit.attempt_ttl, Duration::from_secs(3_600));
        assert_eq!(config.run.submit.fee_markup_bps, 2000);
        assert!(config.run.submit.dry_run);
        assert!(config.run.eligibility.skip_zero_sold);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let raw = RawSettings {
            bot_private_key: None,
            ..minimal()
        };
        assert!(matches!(
            KeeperConfig::from_settings(raw),
            Err(KeeperError::MissingConfig("BOT_PRIVATE_KEY"))
        ));

        let raw = RawSettings {
            registry_address: Some("   ".into()),
            ..minimal()
        };
        assert!(matches!(
            KeeperConfig::from_settings(raw),
            Err(KeeperError::MissingConfig("REGISTRY_ADDRESS"))
        ));
    }

    #[test]
    fn test_invalid_registry_address_rejected() {
        let raw = RawSettings {
            registry_address: Some("0xYOUR_REGISTRY_ADDRESS_HERE".into()),
            ..minimal()
        };
        let err = KeeperConfig::from_settings(raw).unwrap_err();
        assert!(err.to_string().contains("REGISTRY_ADDRESS"));
    }

    #[test]
    fn test_signing_key_debug_is_redacted() {
        let config = KeeperConfig::from_settings(minimal()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ac0974bec39a"));
        assert!(debug.contains("SigningKey(***)"));
    }

    #[test]
    fn test_explorer_tx_url() {
        let config = KeeperConfig::from_settings(RawSettings {
            explorer_url: Some("https://explorer.example/".into()),
            ..minimal()
        })
        .unwrap();
        assert_eq!(
            tx_url(&config.chain.explorer_url, "0xabc"),
            "https://explorer.example/tx/0xabc"
        );
    }

    #[test]
    fn test_ttls_never_drop_below_floor() {
        for raw_ttl in ["0", "-10", "0.5", "59"] {
            let config = KeeperConfig::from_settings(RawSettings {
                attempt_ttl_sec: Some(raw_ttl.into()),
                lock_ttl_sec: Some(raw_ttl.into()),
                ..minimal()
            })
            .unwrap();

            assert_eq!(
                config.run.submit.attempt_ttl,
                Duration::from_secs(MIN_TTL_SEC),
                "attempt TTL for {raw_ttl:?}"
            );
            assert_eq!(
                config.run.lock_ttl,
                Duration::from_secs(MIN_TTL_SEC),
                "lock TTL for {raw_ttl:?}"
            );
        }

        let config = KeeperConfig::from_settings(RawSettings {
            attempt_ttl_sec: Some("61".into()),
            lock_ttl_sec: Some("900".into()),
            ..minimal()
        })
        .unwrap();
        assert_eq!(config.run.submit.attempt_ttl, Duration::from_secs(61));
        assert_eq!(config.run.lock_ttl, Duration::from_secs(900));
    }
}
