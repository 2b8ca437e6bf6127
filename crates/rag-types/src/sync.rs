//! Ingestion run outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::namespace::DataType;

/// Outcome of one data type inside an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOutcome {
    /// Chunks written for this type
    pub documents: usize,
    /// Why this type contributed nothing, if it failed
    pub error: Option<String>,
}

/// Ephemeral record returned from an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// False only when a fatal top-level error stopped the run
    pub success: bool,
    /// Total chunks written across all data types
    pub documents_indexed: usize,
    /// Data types that received at least one chunk
    pub namespaces_processed: Vec<DataType>,
    pub processing_time_ms: u64,
    pub error: Option<String>,
    /// Per-type detail, including partial failures
    #[serde(default)]
    pub by_type: BTreeMap<DataType, TypeOutcome>,
}

impl SyncResult {
    /// Create a failed result for a fatal error.
    pub fn failed(error: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            processing_time_ms,
            ..Default::default()
        }
    }

    /// Record the outcome for one data type.
    pub fn record(&mut self, data_type: DataType, outcome: TypeOutcome) {
        self.documents_indexed += outcome.documents;
        if outcome.documents > 0 && !self.namespaces_processed.contains(&data_type) {
            self.namespaces_processed.push(data_type);
        }
        self.by_type.insert(data_type, outcome);
    }

    /// Data types whose fetch or write failed.
    pub fn failed_types(&self) -> Vec<DataType> {
        self.by_type
            .iter()
            .filter(|(_, o)| o.error.is_some())
            .map(|(t, _)| *t)
            .collect()
    }
}
