//! RAII lease release.

use std::sync::Arc;

use crate::manager::LockManager;
use crate::types::Lease;

/// Lease that is released when dropped.
///
/// Holding the guard across `.await` points is fine; the table mutex is only
/// taken inside `drop`.
pub struct LeaseGuard {
    manager: Arc<LockManager>,
    lease: Lease,
    released: bool,
}

impl LeaseGuard {
    pub(crate) fn new(manager: Arc<LockManager>, lease: Lease) -> Self {
        Self {
            manager,
            lease,
            released: false,
        }
    }

    pub fn lease(&self) -> &Lease {
        &self.lease
    }

    /// Release now. Returns whether the lease was still held.
    pub fn release(mut self) -> bool {
        self.released = true;
        self.manager
            .release(&self.lease.store_id, &self.lease.lease_id)
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if !self.released {
            self.manager
                .release(&self.lease.store_id, &self.lease.lease_id);
        }
    }
}
