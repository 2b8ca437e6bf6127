//! Per-tenant namespace lifecycle state and bootstrap/delete reports.

use std::collections::BTreeMap;
use std::fmt;

use rag_types::DataType;
use serde::{Deserialize, Serialize};

/// Where a tenant's namespace set is in its lifecycle.
///
/// `Uninitialized -> Bootstrapping -> Placeholder -> Indexed -> Deleted`.
/// `Indexed -> Indexed` is the refresh loop; `Deleted` starts over on the
/// next bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceState {
    #[default]
    Uninitialized,
    Bootstrapping,
    Placeholder,
    Indexed,
    Deleted,
}

impl NamespaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceState::Uninitialized => "uninitialized",
            NamespaceState::Bootstrapping => "bootstrapping",
            NamespaceState::Placeholder => "placeholder",
            NamespaceState::Indexed => "indexed",
            NamespaceState::Deleted => "deleted",
        }
    }

    /// State after a successful ingestion run.
    pub fn after_sync(self, documents_indexed: usize) -> Self {
        match self {
            NamespaceState::Deleted => NamespaceState::Deleted,
            _ if documents_indexed > 0 => NamespaceState::Indexed,
            other => other,
        }
    }
}

impl fmt::Display for NamespaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of `create_namespaces`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub store_id: String,
    /// Placeholders written by this call
    pub created: Vec<DataType>,
    /// Namespaces that already held a functional entry
    pub existing: Vec<DataType>,
    pub failed: BTreeMap<DataType, String>,
}

impl BootstrapReport {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            ..Default::default()
        }
    }

    /// Types that are functional after the call.
    pub fn succeeded(&self) -> Vec<DataType> {
        let mut types: Vec<DataType> = self.created.iter().chain(&self.existing).copied().collect();
        types.sort();
        types
    }
}

/// Outcome of `delete_namespaces`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub store_id: String,
    pub deleted: Vec<DataType>,
    pub failed: BTreeMap<DataType, String>,
    /// Whether a periodic sync job was cancelled
    pub sync_cancelled: bool,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_sync() {
        assert_eq!(NamespaceState::Placeholder.after_sync(3), NamespaceState::Indexed);
        assert_eq!(NamespaceState::Indexed.after_sync(1), NamespaceState::Indexed);
        assert_eq!(NamespaceState::Placeholder.after_sync(0), NamespaceState::Placeholder);
        assert_eq!(NamespaceState::Deleted.after_sync(5), NamespaceState::Deleted);
    }

    #[test]
    fn test_report_succeeded() {
        let mut report = BootstrapReport::new("42");
        report.created.push(DataType::Orders);
        report.existing.push(DataType::Store);
        assert_eq!(report.succeeded(), vec![DataType::Store, DataType::Orders]);
    }
}
