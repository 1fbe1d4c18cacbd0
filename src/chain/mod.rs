//! Contract surface the keeper depends on
//!
//! `LotteryChain` is everything a run reads from or writes to the chain:
//! the registry, each lottery, the entropy fee oracle and the signer's
//! nonce. `RpcChain` implements it over JSON-RPC with alloy.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LotteryDetails, LotteryStatus};
use crate::error::Result;

pub mod contracts;
pub mod rpc;

pub use rpc::RpcChain;

/// A rejected `finalize` dry-run, carrying the node's message verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SimulationError {
    pub message: String,
}

impl SimulationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait LotteryChain: Send + Sync {
    /// Number of lotteries in the registry
    async fn lottery_count(&self) -> Result<u64>;

    /// Registry page `[start, start + limit)`
    async fn lotteries(&self, start: u64, limit: u64) -> Result<Vec<Address>>;

    /// Batched `status()` reads, positionally aligned with `lotteries`.
    /// A failed or undecodable read yields `None`.
    async fn statuses(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryStatus>>>;

    /// Batched detail reads, positionally aligned with `lotteries`.
    /// `None` unless every field read succeeded.
    async fn details(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryDetails>>>;

    /// Oracle fee for a provider
    async fn entropy_fee(&self, entropy: Address, provider: Address) -> Result<U256>;

    /// Signer's transaction count including pending transactions
    async fn pending_nonce(&self) -> Result<u64>;

    /// Dry-run `finalize()` from the signer with `value` attached
    async fn simulate_finalize(
        &self,
        lottery: Address,
        value: U256,
    ) -> std::result::Result<(), SimulationError>;

    /// Broadcast `finalize()` with an explicit nonce
    async fn send_finalize(&self, lottery: Address, value: U256, nonce: u64) -> Result<TxHash>;
}
