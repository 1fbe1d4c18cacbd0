//! Registry scanning
//!
//! Each run reads a hot window (the newest entries) and a cold window that
//! walks the registry from a persisted cursor, so every entry is revisited
//! within `ceil(total / cold_size)` runs even if it never sits in the hot
//! window.

use alloy::primitives::Address;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::chain::LotteryChain;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::store::{StateStore, CURSOR_KEY};

/// Half-open registry range `[start, start + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub size: u64,
}

impl Window {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    pub total: u64,
    pub hot: Window,
    pub cold: Window,
    /// Cursor to persist once the run's processing phase is done
    pub next_cursor: u64,
}

/// Plan both windows for a registry of `total` entries.
///
/// A cursor at or past the end wraps to 0; neither window reads past `total`.
pub fn plan(total: u64, cursor: u64, config: &ScanConfig) -> ScanPlan {
    let hot_start = total.saturating_sub(config.hot_size);
    let hot = Window {
        start: hot_start,
        size: total - hot_start,
    };

    let cold_start = if cursor >= total { 0 } else { cursor };
    let cold = Window {
        start: cold_start,
        size: config.cold_size.min(total - cold_start),
    };

    let next_cursor = match cold.end() {
        end if end >= total => 0,
        end => end,
    };

    ScanPlan {
        total,
        hot,
        cold,
        next_cursor,
    }
}

/// Stored cursor, treating absence or garbage as 0
pub fn parse_cursor(raw: Option<&str>) -> u64 {
    match raw.map(str::trim) {
        None | Some("") => 0,
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable cursor {:?}", v);
            0
        }),
    }
}

/// Concatenate and drop repeats, keeping first-seen order
pub fn merge_unique(hot: Vec<Address>, cold: Vec<Address>) -> Vec<Address> {
    let mut seen = HashSet::with_capacity(hot.len() + cold.len());
    hot.into_iter()
        .chain(cold)
        .filter(|address| seen.insert(*address))
        .collect()
}

/// Result of one scan: the plan and the deduplicated candidate set
#[derive(Debug, Clone)]
pub struct Scan {
    pub plan: ScanPlan,
    pub candidates: Vec<Address>,
}

pub struct RegistryScanner<'a> {
    chain: &'a dyn LotteryChain,
    store: &'a dyn StateStore,
    config: ScanConfig,
}

impl<'a> RegistryScanner<'a> {
    pub fn new(chain: &'a dyn LotteryChain, store: &'a dyn StateStore, config: ScanConfig) -> Self {
        Self {
            chain,
            store,
            config,
        }
    }

    /// Scan the registry. `None` means the registry is empty and nothing,
    /// including the cursor, was touched.
    pub async fn scan(&self) -> Result<Option<Scan>> {
        let total = self.chain.lottery_count().await?;
        if total == 0 {
            info!("Registry empty, nothing to scan");
            return Ok(None);
        }

        let cursor = parse_cursor(self.store.get(CURSOR_KEY).await?.as_deref());
        let plan = plan(total, cursor, &self.config);

        info!(
            "Scanning hot [{}..{}) cold [{}..{}) total={}",
            plan.hot.start,
            plan.hot.end(),
            plan.cold.start,
            plan.cold.end(),
            total
        );

        let (hot, cold) = tokio::try_join!(self.fetch(plan.hot), self.fetch(plan.cold))?;
        let candidates = merge_unique(hot, cold);

        Ok(Some(Scan { plan, candidates }))
    }

    async fn fetch(&self, window: Window) -> Result<Vec<Address>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }
        self.chain.lotteries(window.start, window.size).await
    }

    /// Persist the cursor computed by `plan`
    pub async fn commit(&self, plan: &ScanPlan) -> Result<()> {
        self.store
            .put(CURSOR_KEY, &plan.next_cursor.to_string(), None)
            .await
    }
}
