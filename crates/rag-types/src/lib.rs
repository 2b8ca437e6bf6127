//! # rag-types
//!
//! Shared domain types for the tenant RAG subsystem.
//!
//! This crate defines the data structures every other crate speaks:
//! - Data types and namespace keys: how a tenant's knowledge is partitioned
//! - Document chunks: the unit written to the vector store
//! - Sync results: the outcome of one ingestion run
//! - Settings: layered configuration for the whole workspace
//!
//! ## Usage
//!
//! ```rust
//! use rag_types::{DataType, NamespaceKey};
//!
//! let key = NamespaceKey::new("42", DataType::Products);
//! assert_eq!(key.to_string(), "tenant-42-products");
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod namespace;
pub mod sync;

pub use chunk::{ChunkMetadata, DocumentChunk};
pub use config::{
    EmbeddingSettings, IngestionSettings, LlmSettings, LockSettings, NamespaceSettings,
    PlatformSettings, RetrievalSettings, Settings, TenantSeed, VectorSettings,
};
pub use error::TypesError;
pub use namespace::{DataType, NamespaceKey};
pub use sync::{SyncResult, TypeOutcome};
