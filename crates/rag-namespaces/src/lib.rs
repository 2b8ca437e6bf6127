//! # rag-namespaces
//!
//! Owns the lifecycle of each tenant's namespace set.
//!
//! ## Features
//! - [`NamespaceManager::create_namespaces`]: idempotent bootstrap with
//!   placeholder documents and partial-failure tolerance
//! - [`NamespaceManager::delete_namespaces`]: removal under a deletion lease
//! - [`NamespaceManager::trigger_sync`] and the periodic `sync:{store}` jobs,
//!   each run under a lease from the lock manager
//! - [`TenantLifecycle`]: connect, reconnect, disconnect, delete and login
//!   hooks for the account layer

mod error;
mod lifecycle;
mod manager;
mod state;
mod tasks;

#[cfg(test)]
mod testing;

pub use error::NamespaceError;
pub use lifecycle::TenantLifecycle;
pub use manager::NamespaceManager;
pub use state::{BootstrapReport, DeleteReport, NamespaceState};
pub use tasks::BackgroundTasks;
