//! # rag-embeddings
//!
//! Embedding service clients for the tenant RAG subsystem.
//!
//! The embedding provider is an opaque external service; this crate defines
//! the [`EmbeddingModel`] seam and two implementations:
//! - [`ApiEmbedder`]: OpenAI-compatible `/embeddings` endpoint with retries
//! - [`HashingEmbedder`]: deterministic feature-hashing embedder that works
//!   offline (development, tests, air-gapped deployments)

pub mod api;
pub mod error;
pub mod hashing;
pub mod model;

pub use api::{ApiEmbedder, ApiEmbedderConfig};
pub use error::EmbeddingError;
pub use hashing::HashingEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
