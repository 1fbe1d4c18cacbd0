use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use tracing::info;
use zeroize::Zeroize;

use crate::config::SigningKey;
use crate::error::{KeeperError, Result};

/// Transaction signer for the keeper account
///
/// # Security
/// The key text is zeroized as soon as the signer is built and is never
/// stored in this struct.
#[derive(Clone)]
pub struct KeeperWallet {
    signer: PrivateKeySigner,
}

impl KeeperWallet {
    /// Create a wallet from a private key hex string (with or without `0x`)
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let mut secure_key = private_key.trim().trim_start_matches("0x").to_string();

        let parsed = secure_key.parse::<PrivateKeySigner>();
        secure_key.zeroize();

        let signer = parsed
            .map_err(|e| KeeperError::Wallet(format!("Invalid private key: {}", e)))?
            .with_chain_id(Some(chain_id));

        info!("Wallet initialized: {}", signer.address());

        Ok(Self { signer })
    }

    pub fn from_signing_key(key: &SigningKey, chain_id: u64) -> Result<Self> {
        Self::from_private_key(key.expose(), chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.signer.chain_id()
    }

    /// Network wallet used by the provider's signing filler
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for KeeperWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeperWallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id())
            .finish()
    }
}
