pub mod chain;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod keeper;
pub mod services;
pub mod signing;
pub mod store;

pub use chain::{LotteryChain, RpcChain, SimulationError};
pub use config::{KeeperConfig, RunSettings};
pub use domain::{LotteryDetails, LotteryStatus, RunId, RunReport};
pub use error::{KeeperError, Result};
pub use keeper::{RunCoordinator, RunOutcome};
pub use services::Scheduler;
pub use signing::KeeperWallet;
pub use store::{MemoryStore, PostgresStateStore, StateStore};
