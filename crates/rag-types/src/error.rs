//! Error types shared by the tenant RAG crates.

use thiserror::Error;

/// Errors raised while parsing domain values or loading settings.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown data type name
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
