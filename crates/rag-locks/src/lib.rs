//! # rag-locks
//!
//! In-process registry of operation leases per tenant, enforcing
//! priority-based mutual exclusion between the triggers that mutate a
//! tenant's index (periodic sync, manual sync, reconnection, deletion).
//!
//! ## Features
//! - Four priority tiers; a lease blocks equal and lower tiers
//! - The two ingestion tiers also block each other
//! - Type-specific expiry, swept opportunistically on acquire/check
//! - RAII [`LeaseGuard`] that releases on drop
//! - Read-only [`LockStatus`] snapshot for observability
//!
//! The lease table is per process. Horizontally scaled deployments need a
//! shared store behind the same interface.

pub mod error;
pub mod guard;
pub mod manager;
pub mod tier;
pub mod types;

pub use error::LockError;
pub use guard::LeaseGuard;
pub use manager::LockManager;
pub use tier::LockTier;
pub use types::{ConflictCheck, Lease, LockStatus, LockType};
