//! Error types for the RAG engine.

use rag_llm::LlmError;
use rag_platform::PlatformError;
use rag_vector::VectorError;
use thiserror::Error;

/// Errors raised inside ingestion and retrieval.
///
/// Ingestion folds these into a failed `SyncResult`; retrieval turns them
/// into an apology answer. Neither surfaces them to the agent layer.
#[derive(Debug, Error)]
pub enum RagError {
    /// No usable credential; the tenant needs reconnection
    #[error("Credential invalid for store {store_id}: {reason}")]
    CredentialInvalid { store_id: String, reason: String },

    /// Connectivity test failed or timed out
    #[error("Platform unreachable for store {store_id}: {reason}")]
    Connectivity { store_id: String, reason: String },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Vector store error: {0}")]
    Vector(#[from] VectorError),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl RagError {
    /// True when the tenant must reconnect before syncing again.
    pub fn needs_reconnection(&self) -> bool {
        matches!(self, RagError::CredentialInvalid { .. })
    }
}
