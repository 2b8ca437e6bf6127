//! Vector store error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Backend rejected or failed the operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Transport failure talking to a remote backend
    #[error("HTTP error: {0}")]
    Http(String),

    /// Stored record could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] rag_embeddings::EmbeddingError),
}
