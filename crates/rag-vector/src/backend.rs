//! Vector backend trait and record types.

use async_trait::async_trait;
use rag_embeddings::Embedding;
use rag_types::DocumentChunk;

use crate::error::VectorError;

/// A chunk together with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub chunk: DocumentChunk,
    pub embedding: Embedding,
}

impl VectorRecord {
    pub fn new(chunk: DocumentChunk, embedding: Embedding) -> Self {
        Self { chunk, embedding }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// Result of a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity (higher = more similar)
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: DocumentChunk, score: f32) -> Self {
        Self { chunk, score }
    }
}

/// Namespaced upsert/query/delete service.
///
/// Namespaces are created implicitly by the first upsert. Implementations
/// must be thread-safe for concurrent use across tenants.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>)
        -> Result<usize, VectorError>;

    /// Return up to `top_k` records sorted by similarity (best first).
    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), VectorError>;

    /// Delete every record in a namespace. Missing namespaces are not an error.
    async fn delete_all(&self, namespace: &str) -> Result<(), VectorError>;
}
