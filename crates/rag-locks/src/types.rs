//! Lease and status types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority tier of a lease. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Periodic timer re-sync
    BackgroundSync,
    /// User-requested sync (dashboard button, login)
    ManualSync,
    /// Store reconnected after token refresh or reinstall
    Reconnection,
    /// Store removal
    Deletion,
}

impl LockType {
    pub const ALL: [LockType; 4] = [
        LockType::BackgroundSync,
        LockType::ManualSync,
        LockType::Reconnection,
        LockType::Deletion,
    ];

    /// Numeric priority, 1 (lowest) to 4 (highest).
    pub fn priority(&self) -> u8 {
        match self {
            LockType::BackgroundSync => 1,
            LockType::ManualSync => 2,
            LockType::Reconnection => 3,
            LockType::Deletion => 4,
        }
    }

    /// Ingestion tiers write the same namespaces and never run side by side.
    pub fn is_ingestion(&self) -> bool {
        matches!(self, LockType::BackgroundSync | LockType::ManualSync)
    }

    /// Whether a held lease of type `self` blocks a request for `requested`.
    pub fn blocks(&self, requested: LockType) -> bool {
        *self >= requested || (self.is_ingestion() && requested.is_ingestion())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::BackgroundSync => "background_sync",
            LockType::ManualSync => "manual_sync",
            LockType::Reconnection => "reconnection",
            LockType::Deletion => "deletion",
        }
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded grant for one tenant's mutation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub lease_id: String,
    pub store_id: String,
    pub lock_type: LockType,
    /// Short operation name, e.g. "periodic-sync"
    pub operation: String,
    pub acquired_at: DateTime<Utc>,
    pub process_id: u32,
    pub reason: String,
}

/// Result of a read-only conflict check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheck {
    /// Any other lease is held for the store
    pub has_conflicts: bool,
    /// No held lease blocks the requested tier
    pub can_proceed: bool,
    pub blocking_leases: Vec<Lease>,
    pub reason: Option<String>,
}

/// Snapshot of the lease table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockStatus {
    pub total_tenants: usize,
    pub total_leases: usize,
    pub leases_by_type: BTreeMap<LockType, usize>,
    pub tenants: BTreeMap<String, Vec<Lease>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(LockType::BackgroundSync < LockType::ManualSync);
        assert!(LockType::ManualSync < LockType::Reconnection);
        assert!(LockType::Reconnection < LockType::Deletion);
        let priorities: Vec<u8> = LockType::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_blocks_matrix() {
        use LockType::*;
        for held in LockType::ALL {
            for requested in LockType::ALL {
                if requested <= held {
                    assert!(held.blocks(requested), "{held} should block {requested}");
                }
            }
        }
        assert!(BackgroundSync.blocks(ManualSync));
        assert!(!BackgroundSync.blocks(Reconnection));
        assert!(!ManualSync.blocks(Deletion));
        assert!(!Reconnection.blocks(Deletion));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&LockType::BackgroundSync).unwrap(),
            "\"background_sync\""
        );
    }
}
