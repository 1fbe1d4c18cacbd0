#![allow(dead_code)]

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use lotto_keeper::chain::{LotteryChain, SimulationError};
use lotto_keeper::domain::{LotteryDetails, LotteryStatus};
use lotto_keeper::error::{KeeperError, Result};
use lotto_keeper::store::{MemoryStore, StateStore, LOCK_KEY};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const ENTROPY: Address = Address::repeat_byte(0xee);
pub const PROVIDER: Address = Address::repeat_byte(0xdd);
pub const DEFAULT_FEE: u64 = 100;

/// Deadline far enough out that nothing counts as expired
pub const FAR_FUTURE: u64 = 4_102_444_800;

/// Deterministic lottery address for registry index `i`
pub fn lottery(i: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x10;
    bytes[12..].copy_from_slice(&i.to_be_bytes());
    Address::from(bytes)
}

pub fn expired() -> LotteryDetails {
    LotteryDetails {
        paused: false,
        deadline: 1,
        sold: U256::from(3),
        max_tickets: 0,
        entropy: ENTROPY,
        entropy_provider: PROVIDER,
    }
}

pub fn running() -> LotteryDetails {
    LotteryDetails {
        deadline: FAR_FUTURE,
        max_tickets: 100,
        ..expired()
    }
}

pub fn sold_out() -> LotteryDetails {
    LotteryDetails {
        sold: U256::from(100),
        ..running()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Count,
    Lotteries { start: u64, limit: u64 },
    Statuses(usize),
    Details(usize),
    Fee,
    Nonce,
    Simulate { lottery: Address, value: U256 },
    Send { lottery: Address, value: U256, nonce: u64 },
}

#[derive(Default)]
struct State {
    registry: Vec<Address>,
    statuses: HashMap<Address, LotteryStatus>,
    details: HashMap<Address, LotteryDetails>,
    /// Successive oracle answers; the last one repeats
    fees: VecDeque<U256>,
    required_fee: HashMap<Address, U256>,
    rejections: HashMap<Address, String>,
    send_failures: HashSet<Address>,
    fail_status_batch: bool,
    fail_details_batch: bool,
    simulate_delay: Option<Duration>,
    nonce: u64,
    calls: Vec<Call>,
}

/// In-memory registry with scriptable failures
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<State>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of `n` lotteries, all `Open` and expired
    pub fn with_expired(n: u64) -> Self {
        let chain = Self::new();
        for i in 0..n {
            chain.push(lottery(i), Some(LotteryStatus::Open), Some(expired()));
        }
        chain
    }

    pub fn push(
        &self,
        address: Address,
        status: Option<LotteryStatus>,
        details: Option<LotteryDetails>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.registry.push(address);
        if let Some(status) = status {
            state.statuses.insert(address, status);
        }
        if let Some(details) = details {
            state.details.insert(address, details);
        }
    }

    pub fn set_status(&self, address: Address, status: LotteryStatus) {
        self.state.lock().unwrap().statuses.insert(address, status);
    }

    pub fn set_fees(&self, fees: &[u64]) {
        self.state.lock().unwrap().fees = fees.iter().map(|f| U256::from(*f)).collect();
    }

    pub fn require_fee(&self, address: Address, fee: u64) {
        self.state
            .lock()
            .unwrap()
            .required_fee
            .insert(address, U256::from(fee));
    }

    pub fn reject(&self, address: Address, message: &str) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(address, message.to_string());
    }

    pub fn fail_send(&self, address: Address) {
        self.state.lock().unwrap().send_failures.insert(address);
    }

    pub fn fail_status_batch(&self) {
        self.state.lock().unwrap().fail_status_batch = true;
    }

    pub fn fail_details_batch(&self) {
        self.state.lock().unwrap().fail_details_batch = true;
    }

    pub fn delay_simulation(&self, delay: Duration) {
        self.state.lock().unwrap().simulate_delay = Some(delay);
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().nonce = nonce;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn sends(&self) -> Vec<(Address, U256, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send {
                    lottery,
                    value,
                    nonce,
                } => Some((lottery, value, nonce)),
                _ => None,
            })
            .collect()
    }

    pub fn simulations(&self) -> Vec<(Address, U256)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Simulate { lottery, value } => Some((lottery, value)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl LotteryChain for FakeChain {
    async fn lottery_count(&self) -> Result<u64> {
        self.record(Call::Count);
        Ok(self.state.lock().unwrap().registry.len() as u64)
    }

    async fn lotteries(&self, start: u64, limit: u64) -> Result<Vec<Address>> {
        self.record(Call::Lotteries { start, limit });
        let state = self.state.lock().unwrap();
        Ok(state
            .registry
            .iter()
            .skip(start as usize)
            .take(limit as usize)
            .copied()
            .collect())
    }

    async fn statuses(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryStatus>>> {
        self.record(Call::Statuses(lotteries.len()));
        let state = self.state.lock().unwrap();
        if state.fail_status_batch {
            return Err(KeeperError::Rpc("multicall timed out".into()));
        }
        Ok(lotteries
            .iter()
            .map(|a| state.statuses.get(a).copied())
            .collect())
    }

    async fn details(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryDetails>>> {
        self.record(Call::Details(lotteries.len()));
        let state = self.state.lock().unwrap();
        if state.fail_details_batch {
            return Err(KeeperError::Rpc("multicall timed out".into()));
        }
        Ok(lotteries
            .iter()
            .map(|a| state.details.get(a).cloned())
            .collect())
    }

    async fn entropy_fee(&self, _entropy: Address, _provider: Address) -> Result<U256> {
        self.record(Call::Fee);
        let mut state = self.state.lock().unwrap();
        let fee = match state.fees.len() {
            0 => U256::from(DEFAULT_FEE),
            1 => state.fees[0],
            _ => state.fees.pop_front().unwrap_or(U256::from(DEFAULT_FEE)),
        };
        Ok(fee)
    }

    async fn pending_nonce(&self) -> Result<u64> {
        self.record(Call::Nonce);
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn simulate_finalize(
        &self,
        lottery: Address,
        value: U256,
    ) -> std::result::Result<(), SimulationError> {
        self.record(Call::Simulate { lottery, value });
        let delay = self.state.lock().unwrap().simulate_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if let Some(message) = state.rejections.get(&lottery) {
            return Err(SimulationError::new(message.clone()));
        }
        match state.required_fee.get(&lottery) {
            Some(need) if *need > value => Err(SimulationError::new(format!(
                "execution reverted: InsufficientFee: need {}, got {}",
                need, value
            ))),
            _ => Ok(()),
        }
    }

    async fn send_finalize(&self, lottery: Address, value: U256, nonce: u64) -> Result<TxHash> {
        self.record(Call::Send {
            lottery,
            value,
            nonce,
        });
        let mut state = self.state.lock().unwrap();
        if state.send_failures.contains(&lottery) {
            return Err(KeeperError::Rpc("nonce too low".into()));
        }
        state.nonce = state.nonce.max(nonce + 1);
        Ok(TxHash::left_padding_from(&(nonce + 1).to_be_bytes()))
    }
}

/// Store whose lock read-back always shows another run's token
#[derive(Default)]
pub struct RacingStore {
    inner: MemoryStore,
    deletes: Mutex<Vec<String>>,
}

impl RacingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for RacingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        if key == LOCK_KEY {
            // Someone else's write lands right after ours
            return self.inner.put(key, "run-other", ttl).await;
        }
        self.inner.put(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.inner.delete(key).await
    }
}

/// Store that is unreachable
pub struct FailingStore;

#[async_trait]
impl StateStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(KeeperError::Store("connection refused".into()))
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
        Err(KeeperError::Store("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(KeeperError::Store("connection refused".into()))
    }
}
