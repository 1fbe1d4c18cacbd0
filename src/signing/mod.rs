pub mod wallet;

pub use wallet::KeeperWallet;
