//! Per-entity exclusive locks.
//!
//! At most one transaction (or fix) holds the lock for a given entity id.
//! Waiters block until the holder finishes or their timeout expires. Table
//! entries exist only while someone holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::OwnedMutexGuard;

use crate::error::SagaError;

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub struct EntityLocks {
    table: Mutex<HashMap<String, Slot>>,
}

impl EntityLocks {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the lock for `entity_id`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::LockTimeout` if the lock is still held when the
    /// timeout expires.
    pub async fn acquire(
        self: &Arc<Self>,
        entity_id: &str,
        timeout: Duration,
    ) -> Result<EntityLockGuard, SagaError> {
        let started = Instant::now();
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(entity_id.to_string()).or_default())
        };

        match tokio::time::timeout(timeout, Arc::clone(&slot).lock_owned()).await {
            Ok(guard) => Ok(EntityLockGuard {
                locks: Arc::clone(self),
                entity_id: entity_id.to_string(),
                guard: Some(guard),
            }),
            Err(_) => {
                drop(slot);
                self.prune(entity_id);
                let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(entity_id, waited_ms, "lock wait timed out");
                Err(SagaError::LockTimeout {
                    entity_id: entity_id.to_string(),
                    waited_ms,
                })
            }
        }
    }

    /// Whether someone currently holds or awaits the lock for `entity_id`.
    #[must_use]
    pub fn is_tracked(&self, entity_id: &str) -> bool {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity_id)
    }

    /// Number of entity ids with a holder or waiter.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prune(&self, entity_id: &str) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(entity_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            table.remove(entity_id);
        }
    }
}

/// Held lock. Released on drop.
pub struct EntityLockGuard {
    locks: Arc<EntityLocks>,
    entity_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EntityLockGuard {
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl Drop for EntityLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.prune(&self.entity_id);
    }
}
