//! Shared fixtures for the engine's unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rag_embeddings::{Embedding, EmbeddingError, EmbeddingModel, HashingEmbedder, ModelInfo};
use rag_llm::{ChatMessage, LanguageModel, LlmError, MockLanguageModel};
use rag_platform::{
    Credential, Customer, DirectoryCredentialResolver, FixturePlatform, InMemoryTenantDirectory,
    Order, PlatformApi, PlatformConnector, PlatformError, Product, StoreAnalytics, StoreProfile,
    TenantRecord,
};
use rag_types::{DocumentChunk, NamespaceKey, RetrievalSettings};
use rag_vector::{InMemoryBackend, NamespacedVectorStore, ScoredChunk, VectorBackend, VectorError, VectorRecord};

use crate::engine::RagEngine;

fn product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        price,
        currency: Some("SAR".into()),
        categories: vec!["Apparel".into()],
        ..Default::default()
    }
}

/// 1 store, 3 products, 2 orders, 2 customers, analytics.
pub(crate) fn fixture_platform() -> FixturePlatform {
    FixturePlatform::new(StoreProfile {
        id: "42".into(),
        name: "Aurora Outfitters".into(),
        currency: Some("SAR".into()),
        ..Default::default()
    })
    .with_products(vec![
        product("p1", "Linen Shirt", 45.0),
        product("p2", "Canvas Tote", 25.0),
        product("p3", "Wool Beanie", 18.0),
    ])
    .with_orders(vec![
        Order {
            id: "o1".into(),
            status: "shipped".into(),
            total: 70.0,
            ..Default::default()
        },
        Order {
            id: "o2".into(),
            status: "pending".into(),
            total: 18.0,
            ..Default::default()
        },
    ])
    .with_customers(vec![
        Customer {
            id: "c1".into(),
            first_name: "Sara".into(),
            last_name: "Ali".into(),
            ..Default::default()
        },
        Customer {
            id: "c2".into(),
            first_name: "Omar".into(),
            last_name: "Haddad".into(),
            ..Default::default()
        },
    ])
    .with_analytics(StoreAnalytics {
        total_orders: 2,
        total_revenue: 88.0,
        ..Default::default()
    })
}

/// Backend wrapper whose queries can be switched to fail.
pub(crate) struct FlakyBackend {
    inner: Arc<InMemoryBackend>,
    fail_queries: AtomicBool,
}

#[async_trait]
impl VectorBackend for FlakyBackend {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, VectorError> {
        self.inner.upsert(namespace, records).await
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(VectorError::Backend("index unavailable".into()));
        }
        self.inner.query(namespace, embedding, top_k).await
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), VectorError> {
        self.inner.delete(namespace, ids).await
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), VectorError> {
        self.inner.delete_all(namespace).await
    }
}

/// Embedder wrapper whose calls can be switched to fail.
pub(crate) struct FlakyEmbedder {
    inner: HashingEmbedder,
    fail: AtomicBool,
}

#[async_trait]
impl EmbeddingModel for FlakyEmbedder {
    fn info(&self) -> &ModelInfo {
        self.inner.info()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api("embedding service unavailable".into()));
        }
        self.inner.embed(text).await
    }
}

/// Connector whose platform can be replaced between runs.
pub(crate) struct SwappableConnector {
    current: Mutex<Arc<FixturePlatform>>,
}

impl PlatformConnector for SwappableConnector {
    fn connect(&self, _credential: &Credential) -> Result<Arc<dyn PlatformApi>, PlatformError> {
        let platform: Arc<dyn PlatformApi> = self.current.lock().unwrap().clone();
        Ok(platform)
    }
}

/// Model that records the messages it was given.
#[derive(Default)]
pub(crate) struct RecordingModel {
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingModel {
    pub(crate) fn last_messages(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok("recorded".to_string())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

pub(crate) struct Harness {
    pub engine: Arc<RagEngine>,
    pub backend: Arc<InMemoryBackend>,
    pub platform: Arc<FixturePlatform>,
    pub directory: Arc<InMemoryTenantDirectory>,
    flaky: Arc<FlakyBackend>,
    embedder: Arc<FlakyEmbedder>,
    connector: Arc<SwappableConnector>,
}

impl Harness {
    /// Tenant "42" registered with a stored token.
    pub(crate) fn new(platform: FixturePlatform) -> Self {
        Self::with_llm(platform, Arc::new(MockLanguageModel::new()))
    }

    pub(crate) fn with_llm(platform: FixturePlatform, llm: Arc<dyn LanguageModel>) -> Self {
        let directory = InMemoryTenantDirectory::new().with_tenant(
            TenantRecord::new("42", "owner-1")
                .with_access_token("tok-42")
                .with_platform_id("42"),
        );
        Self::build(platform, directory, llm, RetrievalSettings::default())
    }

    pub(crate) fn with_directory(platform: FixturePlatform, directory: InMemoryTenantDirectory) -> Self {
        Self::build(
            platform,
            directory,
            Arc::new(MockLanguageModel::new()),
            RetrievalSettings::default(),
        )
    }

    pub(crate) fn with_retrieval_settings(platform: FixturePlatform, retrieval: RetrievalSettings) -> Self {
        let directory = InMemoryTenantDirectory::new().with_tenant(
            TenantRecord::new("42", "owner-1")
                .with_access_token("tok-42")
                .with_platform_id("42"),
        );
        Self::build(platform, directory, Arc::new(MockLanguageModel::new()), retrieval)
    }

    fn build(
        platform: FixturePlatform,
        directory: InMemoryTenantDirectory,
        llm: Arc<dyn LanguageModel>,
        retrieval: RetrievalSettings,
    ) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let flaky = Arc::new(FlakyBackend {
            inner: backend.clone(),
            fail_queries: AtomicBool::new(false),
        });
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashingEmbedder::default(),
            fail: AtomicBool::new(false),
        });
        let store = Arc::new(NamespacedVectorStore::new(flaky.clone(), embedder.clone(), 64));
        let platform = Arc::new(platform);
        let directory = Arc::new(directory);
        let connector = Arc::new(SwappableConnector {
            current: Mutex::new(platform.clone()),
        });
        let engine = RagEngine::new(
            store,
            llm,
            connector.clone(),
            Arc::new(DirectoryCredentialResolver::new(directory.clone())),
            directory.clone(),
        )
        .with_retrieval_settings(retrieval);

        Self {
            engine: Arc::new(engine),
            backend,
            platform,
            directory,
            flaky,
            embedder,
            connector,
        }
    }

    /// Serve `platform` to every later ingestion run.
    pub(crate) fn replace_platform(&self, platform: FixturePlatform) {
        *self.connector.current.lock().unwrap() = Arc::new(platform);
    }

    pub(crate) fn fail_queries(&self, fail: bool) {
        self.flaky.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_embeddings(&self, fail: bool) {
        self.embedder.fail.store(fail, Ordering::SeqCst);
    }

    /// Write a placeholder into every namespace of a tenant.
    pub(crate) async fn seed_placeholders(&self, store_id: &str) {
        for key in NamespaceKey::all_for(store_id) {
            self.engine
                .vector_store()
                .add_documents(&key, vec![DocumentChunk::placeholder(&key)])
                .await
                .unwrap();
        }
    }
}
