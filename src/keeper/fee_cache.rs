use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use tracing::debug;

use crate::chain::LotteryChain;
use crate::error::Result;

/// Oracle contract plus provider identity. `Address` compares bytes, so
/// checksum casing never splits an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeeKey {
    pub entropy: Address,
    pub provider: Address,
}

impl FeeKey {
    pub fn new(entropy: Address, provider: Address) -> Self {
        Self { entropy, provider }
    }
}

/// Oracle fees seen during one run
#[derive(Debug, Default)]
pub struct FeeCache {
    fees: HashMap<FeeKey, U256>,
}

impl FeeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FeeKey) -> Option<U256> {
        self.fees.get(key).copied()
    }

    pub fn insert(&mut self, key: FeeKey, fee: U256) {
        self.fees.insert(key, fee);
    }

    /// Cached fee, or a live oracle read that populates the cache
    pub async fn resolve(&mut self, chain: &dyn LotteryChain, key: FeeKey) -> Result<U256> {
        if let Some(fee) = self.get(&key) {
            return Ok(fee);
        }
        self.refresh(chain, key).await
    }

    /// Always read the oracle and overwrite the cached value
    pub async fn refresh(&mut self, chain: &dyn LotteryChain, key: FeeKey) -> Result<U256> {
        let fee = chain.entropy_fee(key.entropy, key.provider).await?;
        debug!(entropy = %key.entropy, provider = %key.provider, %fee, "Oracle fee read");
        self.insert(key, fee);
        Ok(fee)
    }

    pub fn len(&self) -> usize {
        self.fees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }
}

/// Value to attach: the fee plus `markup_bps` basis points
pub fn apply_markup(fee: U256, markup_bps: u32) -> U256 {
    if markup_bps == 0 {
        return fee;
    }
    fee.saturating_add(fee.saturating_mul(U256::from(markup_bps)) / U256::from(10_000u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_markup() {
        assert_eq!(apply_markup(U256::from(100), 0), U256::from(100));
        assert_eq!(apply_markup(U256::from(100), 2000), U256::from(120));
        assert_eq!(apply_markup(U256::from(3), 2000), U256::from(3));
        assert_eq!(apply_markup(U256::MAX, 2000), U256::MAX);
    }

    #[test]
    fn test_entries_keyed_by_pair() {
        let mut cache = FeeCache::new();
        let entropy = Address::repeat_byte(1);
        let a = FeeKey::new(entropy, Address::repeat_byte(2));
        let b = FeeKey::new(entropy, Address::repeat_byte(3));

        cache.insert(a, U256::from(100));
        assert_eq!(cache.get(&a), Some(U256::from(100)));
        assert_eq!(cache.get(&b), None);

        cache.insert(a, U256::from(120));
        assert_eq!(cache.get(&a), Some(U256::from(120)));
        assert_eq!(cache.len(), 1);
    }
}
