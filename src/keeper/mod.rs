//! The scheduled finalization job

pub mod budget;
pub mod context;
pub mod coordinator;
pub mod eligibility;
pub mod fee_cache;
pub mod lock;
pub mod pipeline;
pub mod scanner;
pub mod submitter;

pub use budget::BudgetGovernor;
pub use context::RunContext;
pub use coordinator::{RunCoordinator, RunOutcome};
pub use eligibility::{evaluate, is_eligible, is_open, Verdict};
pub use fee_cache::{apply_markup, FeeCache, FeeKey};
pub use lock::{LockAcquire, RunLock};
pub use pipeline::Pipeline;
pub use scanner::{plan, RegistryScanner, Scan, ScanPlan, Window};
pub use submitter::{is_stale_fee_error, SubmitOutcome, TransactionSubmitter};
