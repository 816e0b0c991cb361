//! Per-vault mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Registry = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Registry of one async mutex per vault id.
///
/// Every load–mutate–persist unit on a vault runs while holding that vault's
/// guard, so a sweep and an interactive action on the same vault never
/// interleave. Different vaults never contend. An entry lives only while some
/// caller holds or waits for it.
#[derive(Clone, Default)]
pub struct VaultLocks {
    locks: Registry,
}

/// Exclusive access to one vault. Releasing the last guard prunes the entry.
pub struct VaultGuard {
    guard: Option<OwnedMutexGuard<()>>,
    vault_id: String,
    locks: Registry,
}

impl Drop for VaultGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The registry's own reference is the only one left: nobody waits.
        if locks
            .get(&self.vault_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.vault_id);
        }
    }
}

impl VaultLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `vault_id`.
    pub async fn acquire(&self, vault_id: &str) -> VaultGuard {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(vault_id.to_string())
            .or_default()
            .clone();
        VaultGuard {
            guard: Some(lock.lock_owned().await),
            vault_id: vault_id.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of vault ids currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
