//! Error types for namespace management.

use std::collections::BTreeMap;

use rag_locks::LockError;
use rag_platform::PlatformError;
use rag_scheduler::SchedulerError;
use rag_types::DataType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamespaceError {
    /// Too few namespaces, or no essential namespace, could be created
    #[error("Namespace bootstrap failed for store {store_id}: {succeeded} types succeeded, errors: {errors:?}")]
    BootstrapFailed {
        store_id: String,
        succeeded: usize,
        errors: BTreeMap<DataType, String>,
    },

    /// A higher or equal priority lease blocks the operation
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("Tenant {0} is inactive and needs reconnection")]
    TenantInactive(String),

    #[error("Tenant record error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl NamespaceError {
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, NamespaceError::Lock(e) if e.is_conflict())
    }
}
