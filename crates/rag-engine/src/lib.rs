//! # rag-engine
//!
//! Tenant-scoped ingestion and retrieval over namespaced vector storage.
//!
//! ## Ingestion
//! [`RagEngine::index_tenant_data`] resolves the tenant's credential, tests
//! the platform connection, fetches store profile, products, orders,
//! customers and analytics concurrently, and writes them as chunks into the
//! tenant's namespaces. Runs are single-flight per tenant.
//!
//! ## Retrieval
//! [`RagEngine::search`] picks namespaces by [`AgentRole`], fans the query
//! out, merges candidates by score and asks the language model for an
//! answer. It always returns a [`RagAnswer`].

mod credentials;
mod documents;
mod engine;
mod error;
mod ingest;
mod memory;
mod retrieval;

#[cfg(test)]
mod testing;

pub use credentials::CredentialChain;
pub use documents::{count_tokens, DocumentProcessor, CONVERSATION_SOURCE, PLATFORM_SOURCE};
pub use engine::RagEngine;
pub use error::RagError;
pub use memory::{ConversationMemory, ConversationTurn};
pub use retrieval::{
    confidence, AgentRole, AnswerMetadata, RagAnswer, SearchContext, SearchOptions,
    SourceDocument, APOLOGY_ANSWER, MAX_CONFIDENCE, MIN_CONFIDENCE, NO_INFORMATION_ANSWER,
};
