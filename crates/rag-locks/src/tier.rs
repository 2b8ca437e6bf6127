//! Tier-bound helpers.

use std::time::Duration;

use crate::error::LockError;
use crate::manager::LockManager;
use crate::types::{ConflictCheck, Lease, LockType};

/// View of the lock manager fixed to one [`LockType`].
///
/// ```
/// use rag_locks::LockManager;
///
/// let locks = LockManager::default();
/// let lease = locks.background_sync().acquire("42", "periodic-sync", "timer").unwrap();
/// assert!(locks.manual_sync().acquire("42", "manual-sync", "button").is_err());
/// assert!(locks.background_sync().release("42", &lease.lease_id));
/// ```
#[derive(Clone, Copy)]
pub struct LockTier<'a> {
    manager: &'a LockManager,
    lock_type: LockType,
}

impl<'a> LockTier<'a> {
    pub(crate) fn new(manager: &'a LockManager, lock_type: LockType) -> Self {
        Self { manager, lock_type }
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    pub fn acquire(&self, store_id: &str, operation: &str, reason: &str) -> Result<Lease, LockError> {
        self.manager.acquire(store_id, self.lock_type, operation, reason)
    }

    pub fn release(&self, store_id: &str, lease_id: &str) -> bool {
        self.manager.release(store_id, lease_id)
    }

    pub fn check_conflicts(&self, store_id: &str) -> ConflictCheck {
        self.manager.check_conflicts(store_id, self.lock_type)
    }

    pub async fn wait_for_availability(
        &self,
        store_id: &str,
        timeout: Duration,
    ) -> Result<(), LockError> {
        self.manager
            .wait_for_availability(store_id, self.lock_type, timeout)
            .await
    }
}
