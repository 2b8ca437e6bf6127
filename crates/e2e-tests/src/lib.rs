//! End-to-end test infrastructure for tenant-rag.
//!
//! Provides a shared TestHarness wiring the real lock manager, namespace
//! manager, engine and scheduler over an in-memory index, a hashing
//! embedder, the mock model and a fixture platform.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rag_embeddings::{Embedding, HashingEmbedder};
use rag_engine::RagEngine;
use rag_llm::MockLanguageModel;
use rag_locks::LockManager;
use rag_namespaces::NamespaceManager;
use rag_platform::{
    Customer, DirectoryCredentialResolver, FixtureConnector, FixtureFailure, FixturePlatform,
    InMemoryTenantDirectory, Order, Product, StoreAnalytics, StoreProfile, TenantRecord,
};
use rag_scheduler::{SchedulerConfig, SchedulerService};
use rag_types::{DataType, LockSettings, NamespaceSettings};
use rag_vector::{
    InMemoryBackend, NamespacedVectorStore, ScoredChunk, VectorBackend, VectorError, VectorRecord,
};

/// Tenant every harness registers.
pub const STORE_ID: &str = "1001";
pub const OWNER_ID: &str = "merchant-1";
pub const ACCESS_TOKEN: &str = "tok-1001";

/// The three products of the fixture catalogue.
pub const PRODUCT_NAMES: [&str; 3] = ["Linen Shirt", "Canvas Tote", "Wool Beanie"];

fn product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        price,
        currency: Some("SAR".into()),
        quantity: Some(12),
        categories: vec!["Apparel".into()],
        ..Default::default()
    }
}

/// 1 store, 3 products, 2 orders, 2 customers, analytics.
pub fn fixture_store() -> FixturePlatform {
    FixturePlatform::new(StoreProfile {
        id: STORE_ID.into(),
        name: "Aurora Outfitters".into(),
        description: Some("Everyday clothing and accessories".into()),
        currency: Some("SAR".into()),
        ..Default::default()
    })
    .with_products(vec![
        product("p1", PRODUCT_NAMES[0], 45.0),
        product("p2", PRODUCT_NAMES[1], 25.0),
        product("p3", PRODUCT_NAMES[2], 18.0),
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
        period: Some("last 30 days".into()),
        total_orders: 2,
        total_revenue: 88.0,
        total_customers: 2,
        total_products: 3,
        ..Default::default()
    })
}

/// Same store with an orders endpoint answering 404.
pub fn fixture_store_without_orders() -> FixturePlatform {
    fixture_store().with_failure(DataType::Orders, FixtureFailure::NotFound)
}

/// In-memory backend whose queries can be switched off.
pub struct SwitchableBackend {
    inner: Arc<InMemoryBackend>,
    queries_down: AtomicBool,
}

impl SwitchableBackend {
    pub fn set_queries_down(&self, down: bool) {
        self.queries_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorBackend for SwitchableBackend {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, VectorError> {
        self.inner.upsert(namespace, records).await
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        if self.queries_down.load(Ordering::SeqCst) {
            return Err(VectorError::Backend("index unreachable".into()));
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

/// Shared test harness for E2E tests.
pub struct TestHarness {
    pub manager: Arc<NamespaceManager>,
    pub engine: Arc<RagEngine>,
    pub locks: Arc<LockManager>,
    pub backend: Arc<InMemoryBackend>,
    pub switch: Arc<SwitchableBackend>,
    pub platform: Arc<FixturePlatform>,
    pub directory: Arc<InMemoryTenantDirectory>,
}

impl TestHarness {
    /// Harness serving `platform` for tenant [`STORE_ID`], which is active
    /// and holds [`ACCESS_TOKEN`].
    pub async fn new(platform: FixturePlatform) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let switch = Arc::new(SwitchableBackend {
            inner: backend.clone(),
            queries_down: AtomicBool::new(false),
        });
        let store = Arc::new(NamespacedVectorStore::new(
            switch.clone(),
            Arc::new(HashingEmbedder::default()),
            64,
        ));

        let platform = Arc::new(platform);
        let directory = Arc::new(InMemoryTenantDirectory::new().with_tenant(
            TenantRecord::new(STORE_ID, OWNER_ID)
                .with_access_token(ACCESS_TOKEN)
                .with_platform_id(STORE_ID),
        ));
        let engine = Arc::new(RagEngine::new(
            store,
            Arc::new(MockLanguageModel::new()),
            Arc::new(
                FixtureConnector::new()
                    .with_store(STORE_ID, platform.clone())
                    .accept_token(ACCESS_TOKEN),
            ),
            Arc::new(DirectoryCredentialResolver::new(directory.clone())),
            directory.clone(),
        ));

        let locks = Arc::new(LockManager::new(LockSettings::default()));
        let scheduler = Arc::new(
            SchedulerService::new(SchedulerConfig::default())
                .await
                .expect("Failed to create scheduler"),
        );
        let manager = NamespaceManager::new(
            engine.clone(),
            locks.clone(),
            scheduler,
            NamespaceSettings {
                creation_delay_ms: 0,
                manual_sync_wait_ms: 0,
                ..Default::default()
            },
        );

        Self {
            manager,
            engine,
            locks,
            backend,
            switch,
            platform,
            directory,
        }
    }

    /// Namespace name of a data type for [`STORE_ID`].
    pub fn namespace(&self, data_type: DataType) -> String {
        rag_types::NamespaceKey::new(STORE_ID, data_type).to_string()
    }

    /// Total non-placeholder records across the tenant's namespaces.
    pub fn real_document_count(&self) -> usize {
        DataType::ALL
            .iter()
            .flat_map(|t| self.backend.ids(&self.namespace(*t)))
            .filter(|id| !id.starts_with("placeholder-"))
            .count()
    }
}
