//! Durable key-value state shared between runs
//!
//! Holds the run lock, the cold-scan cursor and per-lottery attempt records.
//! Read-after-write is treated as best effort by every caller.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStateStore;

pub const LOCK_KEY: &str = "lock";
pub const CURSOR_KEY: &str = "cursor";
const ATTEMPT_PREFIX: &str = "attempt:";
const DRY_RUN_ATTEMPT_PREFIX: &str = "dry-run:attempt:";

/// Idempotency key for a lottery, independent of address checksum casing
pub fn attempt_key(lottery: &Address) -> String {
    format!("{}{}", ATTEMPT_PREFIX, lottery.to_string().to_lowercase())
}

/// Attempt key used by dry runs; never consulted by live runs
pub fn dry_run_attempt_key(lottery: &Address) -> String {
    format!("{}{}", DRY_RUN_ATTEMPT_PREFIX, lottery.to_string().to_lowercase())
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current value, or None if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value; `ttl = None` keeps it until overwritten or deleted
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}
