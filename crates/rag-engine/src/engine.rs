//! The RAG engine: owns the collaborators ingestion and retrieval share.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use rag_llm::LanguageModel;
use rag_platform::{CredentialResolver, PlatformConnector, TenantDirectory};
use rag_types::{IngestionSettings, NamespaceKey, RetrievalSettings, SyncResult};
use rag_vector::NamespacedVectorStore;

use crate::credentials::CredentialChain;
use crate::documents::DocumentProcessor;
use crate::memory::ConversationMemory;

pub(crate) type SharedSync = Shared<BoxFuture<'static, SyncResult>>;

/// Tenant-scoped ingestion and retrieval over namespaced vector storage.
///
/// Hold it in an `Arc`; ingestion runs are single-flight per tenant and the
/// shared run future keeps the engine alive until it finishes.
pub struct RagEngine {
    pub(crate) store: Arc<NamespacedVectorStore>,
    pub(crate) llm: Arc<dyn LanguageModel>,
    pub(crate) connector: Arc<dyn PlatformConnector>,
    pub(crate) directory: Arc<dyn TenantDirectory>,
    pub(crate) credentials: CredentialChain,
    pub(crate) processor: DocumentProcessor,
    pub(crate) memory: ConversationMemory,
    pub(crate) ingestion: IngestionSettings,
    pub(crate) retrieval: RetrievalSettings,
    pub(crate) inflight: Mutex<HashMap<String, SharedSync>>,
    /// Chunk ids each upstream namespace received on its last successful write.
    pub(crate) written: Mutex<HashMap<NamespaceKey, HashSet<String>>>,
}

impl RagEngine {
    pub fn new(
        store: Arc<NamespacedVectorStore>,
        llm: Arc<dyn LanguageModel>,
        connector: Arc<dyn PlatformConnector>,
        resolver: Arc<dyn CredentialResolver>,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        let ingestion = IngestionSettings::default();
        let retrieval = RetrievalSettings::default();
        Self {
            store,
            llm,
            connector,
            credentials: CredentialChain::new(resolver, directory.clone()),
            directory,
            processor: DocumentProcessor::new(ingestion.max_chunk_tokens),
            memory: ConversationMemory::new(
                retrieval.conversation_cache_capacity,
                retrieval.conversation_turns,
            ),
            ingestion,
            retrieval,
            inflight: Mutex::new(HashMap::new()),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ingestion_settings(mut self, settings: IngestionSettings) -> Self {
        self.processor = DocumentProcessor::new(settings.max_chunk_tokens);
        self.ingestion = settings;
        self
    }

    pub fn with_retrieval_settings(mut self, settings: RetrievalSettings) -> Self {
        self.memory = ConversationMemory::new(
            settings.conversation_cache_capacity,
            settings.conversation_turns,
        );
        self.retrieval = settings;
        self
    }

    pub fn vector_store(&self) -> &Arc<NamespacedVectorStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    pub fn conversation_memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn ingestion_settings(&self) -> &IngestionSettings {
        &self.ingestion
    }

    pub fn retrieval_settings(&self) -> &RetrievalSettings {
        &self.retrieval
    }

    /// Drop per-tenant caches such as client handles and conversation memory.
    pub fn forget_tenant(&self, store_id: &str) -> usize {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|key, _| key.store_id != store_id);
        self.store.evict_tenant(store_id) + self.memory.forget_tenant(store_id)
    }

    /// Whether an ingestion run for the tenant is in flight.
    pub fn is_indexing(&self, store_id: &str) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(store_id)
    }
}
