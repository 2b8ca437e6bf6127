//! Document chunks, the unit of storage in a namespace.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::namespace::{DataType, NamespaceKey};

/// Source tag carried by placeholder documents.
pub const PLACEHOLDER_SOURCE: &str = "placeholder";

/// Metadata stored alongside a chunk's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Namespace data type this chunk belongs to
    pub data_type: DataType,
    /// Owning tenant
    pub store_id: String,
    /// Where the content came from (e.g. "platform", "agent", "placeholder")
    pub source: String,
    /// When the chunk was produced
    pub timestamp: DateTime<Utc>,
    /// Type-specific structured fields (product id, price, category, ...)
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ChunkMetadata {
    pub fn new(data_type: DataType, store_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            data_type,
            store_id: store_id.into(),
            source: source.into(),
            timestamp: Utc::now(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a structured field (builder pattern).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == PLACEHOLDER_SOURCE
    }
}

/// A normalized, embeddable piece of tenant knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Deterministic id; re-indexing the same source replaces the chunk
    pub id: String,
    /// Human-readable text that gets embedded
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }

    /// Minimal synthetic document that makes a fresh namespace queryable.
    pub fn placeholder(key: &NamespaceKey) -> Self {
        let content = format!(
            "Placeholder for {} data of store {}. Real data has not been indexed yet.",
            key.data_type, key.store_id
        );
        let metadata = ChunkMetadata::new(key.data_type, key.store_id.clone(), PLACEHOLDER_SOURCE)
            .with_field("placeholder", true);
        Self::new(key.placeholder_id(), content, metadata)
    }

    pub fn is_placeholder(&self) -> bool {
        self.metadata.is_placeholder()
    }
}
