//! Best-effort run lock over the state store
//!
//! Read, write, read back. The store offers no compare-and-swap, so two
//! schedulers can still both win in a narrow window; attempt records are
//! what actually prevents double finalization.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::RunId;
use crate::error::Result;
use crate::store::{StateStore, LOCK_KEY};

#[derive(Debug)]
pub enum LockAcquire<'a> {
    Acquired(RunLock<'a>),
    /// Another run holds the lock (or held it within the TTL)
    Held { holder: String },
    /// Wrote our token but read back someone else's
    RaceLost { holder: Option<String> },
}

/// Proof of lock ownership for one run
pub struct RunLock<'a> {
    store: &'a dyn StateStore,
    run_id: RunId,
}

impl std::fmt::Debug for RunLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock")
            .field("run_id", &self.run_id)
            .finish()
    }
}

impl<'a> RunLock<'a> {
    pub async fn acquire(
        store: &'a dyn StateStore,
        run_id: &RunId,
        ttl: Duration,
    ) -> Result<LockAcquire<'a>> {
        if let Some(holder) = store.get(LOCK_KEY).await? {
            warn!("Locked by run {}. Skipping.", holder);
            return Ok(LockAcquire::Held { holder });
        }

        store.put(LOCK_KEY, run_id.as_str(), Some(ttl)).await?;

        let confirmed = store.get(LOCK_KEY).await?;
        if confirmed.as_deref() != Some(run_id.as_str()) {
            warn!("Lock race lost (holder: {:?}). Exiting.", confirmed);
            return Ok(LockAcquire::RaceLost { holder: confirmed });
        }

        debug!("Lock acquired for {}s", ttl.as_secs());
        Ok(LockAcquire::Acquired(RunLock {
            store,
            run_id: run_id.clone(),
        }))
    }

    /// Delete the lock only if it still carries our token. Returns whether
    /// it was deleted; a lock that expired and was re-taken is left alone.
    pub async fn release(self) -> Result<bool> {
        let current = self.store.get(LOCK_KEY).await?;
        if current.as_deref() != Some(self.run_id.as_str()) {
            warn!(
                "Lock no longer ours (holder: {:?}), leaving it in place",
                current
            );
            return Ok(false);
        }

        self.store.delete(LOCK_KEY).await?;
        info!("🔓 Lock released");
        Ok(true)
    }
}
