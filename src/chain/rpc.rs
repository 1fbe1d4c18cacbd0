use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::contracts::{IEntropy, ILottery, ILotteryRegistry, IMulticall3};
use super::{LotteryChain, SimulationError};
use crate::config::ChainConfig;
use crate::domain::{LotteryDetails, LotteryStatus};
use crate::error::{KeeperError, Result};
use crate::signing::KeeperWallet;

/// Calls per lottery in a detail batch
const DETAIL_FIELDS: usize = 6;

/// JSON-RPC implementation of [`LotteryChain`]
///
/// Per-lottery reads are batched through Multicall3 `aggregate3` with
/// `allowFailure` set, so one broken lottery never fails the whole batch.
#[derive(Clone)]
pub struct RpcChain {
    provider: DynProvider,
    registry: Address,
    multicall: Address,
    sender: Address,
}

impl RpcChain {
    pub fn connect(config: &ChainConfig, wallet: &KeeperWallet) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(config.rpc_url.clone())
            .erased();

        Self {
            provider,
            registry: config.registry,
            multicall: config.multicall,
            sender: wallet.address(),
        }
    }

    async fn aggregate(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::CallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let expected = calls.len();
        let multicall = IMulticall3::new(self.multicall, self.provider.clone());
        let results = multicall
            .aggregate3(calls)
            .call()
            .await
            .map_err(|e| KeeperError::Rpc(format!("Multicall aggregate3 failed: {}", e)))?;

        if results.len() != expected {
            return Err(KeeperError::Rpc(format!(
                "Multicall returned {} results for {} calls",
                results.len(),
                expected
            )));
        }

        Ok(results)
    }
}

fn call3<C: SolCall>(target: Address, call: C) -> IMulticall3::Call3 {
    IMulticall3::Call3 {
        target,
        allowFailure: true,
        callData: call.abi_encode().into(),
    }
}

fn decode<C: SolCall>(result: &IMulticall3::CallResult) -> Option<C::Return> {
    if !result.success {
        return None;
    }
    C::abi_decode_returns(result.returnData.as_ref()).ok()
}

fn decode_details(results: &[IMulticall3::CallResult]) -> Option<LotteryDetails> {
    let [deadline, sold, max_tickets, paused, entropy, provider] = results else {
        return None;
    };

    Some(LotteryDetails {
        deadline: decode::<ILottery::deadlineCall>(deadline)?,
        sold: decode::<ILottery::getSoldCall>(sold)?,
        max_tickets: decode::<ILottery::maxTicketsCall>(max_tickets)?,
        paused: decode::<ILottery::pausedCall>(paused)?,
        entropy: decode::<ILottery::entropyCall>(entropy)?,
        entropy_provider: decode::<ILottery::entropyProviderCall>(provider)?,
    })
}

#[async_trait]
impl LotteryChain for RpcChain {
    async fn lottery_count(&self) -> Result<u64> {
        let registry = ILotteryRegistry::new(self.registry, self.provider.clone());
        let count = registry
            .getAllLotteriesCount()
            .call()
            .await
            .map_err(|e| KeeperError::Contract(format!("getAllLotteriesCount failed: {}", e)))?;

        u64::try_from(count)
            .map_err(|_| KeeperError::Contract(format!("Registry count {} exceeds u64", count)))
    }

    #[instrument(skip(self))]
    async fn lotteries(&self, start: u64, limit: u64) -> Result<Vec<Address>> {
        let registry = ILotteryRegistry::new(self.registry, self.provider.clone());
        let page = registry
            .getAllLotteries(U256::from(start), U256::from(limit))
            .call()
            .await
            .map_err(|e| KeeperError::Contract(format!("getAllLotteries failed: {}", e)))?;

        debug!("Fetched {} registry entries", page.len());
        Ok(page)
    }

    async fn statuses(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryStatus>>> {
        let calls = lotteries
            .iter()
            .map(|lottery| call3(*lottery, ILottery::statusCall {}))
            .collect();

        let results = self.aggregate(calls).await?;

        Ok(results
            .iter()
            .map(|r| {
                decode::<ILottery::statusCall>(r).and_then(|raw| LotteryStatus::try_from(raw).ok())
            })
            .collect())
    }

    async fn details(&self, lotteries: &[Address]) -> Result<Vec<Option<LotteryDetails>>> {
        let calls = lotteries
            .iter()
            .flat_map(|lottery| {
                [
                    call3(*lottery, ILottery::deadlineCall {}),
                    call3(*lottery, ILottery::getSoldCall {}),
                    call3(*lottery, ILottery::maxTicketsCall {}),
                    call3(*lottery, ILottery::pausedCall {}),
                    call3(*lottery, ILottery::entropyCall {}),
                    call3(*lottery, ILottery::entropyProviderCall {}),
                ]
            })
            .collect();

        let results = self.aggregate(calls).await?;

        Ok(results.chunks(DETAIL_FIELDS).map(decode_details).collect())
    }

    async fn entropy_fee(&self, entropy: Address, provider: Address) -> Result<U256> {
        IEntropy::new(entropy, self.provider.clone())
            .getFee(provider)
            .call()
            .await
            .map_err(|e| KeeperError::Contract(format!("getFee failed: {}", e)))
    }

    async fn pending_nonce(&self) -> Result<u64> {
        self.provider
            .get_transaction_count(self.sender)
            .pending()
            .await
            .map_err(|e| KeeperError::Rpc(format!("Failed to read pending nonce: {}", e)))
    }

    async fn simulate_finalize(
        &self,
        lottery: Address,
        value: U256,
    ) -> std::result::Result<(), SimulationError> {
        ILottery::new(lottery, self.provider.clone())
            .finalize()
            .from(self.sender)
            .value(value)
            .call()
            .await
            .map(|_| ())
            .map_err(|e| SimulationError::new(e.to_string()))
    }

    async fn send_finalize(&self, lottery: Address, value: U256, nonce: u64) -> Result<TxHash> {
        let pending = ILottery::new(lottery, self.provider.clone())
            .finalize()
            .from(self.sender)
            .value(value)
            .nonce(nonce)
            .send()
            .await
            .map_err(|e| KeeperError::Contract(format!("finalize tx failed: {}", e)))?;

        Ok(*pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use alloy::sol_types::SolValue;

    fn ok<T: SolValue>(value: T) -> IMulticall3::CallResult {
        IMulticall3::CallResult {
            success: true,
            returnData: Bytes::from(value.abi_encode()),
        }
    }

    fn failed() -> IMulticall3::CallResult {
        IMulticall3::CallResult {
            success: false,
            returnData: Bytes::new(),
        }
    }

    #[test]
    fn test_decode_details_all_fields() {
        let entropy = Address::repeat_byte(0xee);
        let provider = Address::repeat_byte(0xaa);
        let results = vec![
            ok(1_700_000_000u64),
            ok(U256::from(5)),
            ok(100u64),
            ok(false),
            ok(entropy),
            ok(provider),
        ];

        let details = decode_details(&results).unwrap();
        assert_eq!(details.deadline, 1_700_000_000);
        assert_eq!(details.sold, U256::from(5));
        assert_eq!(details.max_tickets, 100);
        assert!(!details.paused);
        assert_eq!(details.entropy, entropy);
        assert_eq!(details.entropy_provider, provider);
    }

    #[test]
    fn test_decode_details_any_failure_is_none() {
        let results = vec![
            ok(1_700_000_000u64),
            ok(U256::from(5)),
            ok(100u64),
            failed(),
            ok(Address::ZERO),
            ok(Address::ZERO),
        ];
        assert!(decode_details(&results).is_none());
        assert!(decode_details(&results[..5]).is_none());
    }

    #[test]
    fn test_status_call_encoding() {
        let call = call3(Address::repeat_byte(1), ILottery::statusCall {});
        assert!(call.allowFailure);
        assert_eq!(call.callData.as_ref(), ILottery::statusCall::SELECTOR.as_slice());
    }
}
