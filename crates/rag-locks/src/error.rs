//! Lock manager error types.

use std::time::Duration;

use thiserror::Error;

use crate::types::{Lease, LockType};

/// Errors returned by the lock manager.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another lease blocks the requested tier
    #[error("Lock conflict for store {store_id} ({requested}): {reason}")]
    Conflict {
        store_id: String,
        requested: LockType,
        blocking_leases: Vec<Lease>,
        reason: String,
    },

    /// The tier did not become available in time
    #[error("Timed out after {waited:?} waiting for {lock_type} on store {store_id}")]
    WaitTimeout {
        store_id: String,
        lock_type: LockType,
        waited: Duration,
    },
}

impl LockError {
    /// Leases that caused a conflict (empty for other errors).
    pub fn blocking_leases(&self) -> &[Lease] {
        match self {
            LockError::Conflict {
                blocking_leases, ..
            } => blocking_leases,
            LockError::WaitTimeout { .. } => &[],
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LockError::Conflict { .. })
    }
}
