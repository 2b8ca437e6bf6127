//! # rag-vector
//!
//! Namespaced vector store adapter for the tenant RAG subsystem.
//!
//! The vector database is an opaque namespaced upsert/query/delete service.
//! This crate puts the [`VectorBackend`] seam in front of it and layers
//! embedding plus a bounded client cache on top.
//!
//! ## Features
//! - [`InMemoryBackend`]: DashMap-backed cosine search for development and tests
//! - [`HttpBackend`]: Pinecone-style REST index
//! - [`NamespacedVectorStore`]: embeds chunks and queries by namespace key
//! - [`ClientCache`]: LRU of per-`(store_id, namespace)` client handles

pub mod backend;
pub mod cache;
pub mod error;
pub mod http;
pub mod memory;
pub mod store;

pub use backend::{ScoredChunk, VectorBackend, VectorRecord};
pub use cache::ClientCache;
pub use error::VectorError;
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::InMemoryBackend;
pub use store::{NamespaceClient, NamespacedVectorStore};
