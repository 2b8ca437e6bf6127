//! Fixtures for the namespace manager's unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rag_embeddings::{Embedding, HashingEmbedder};
use rag_engine::RagEngine;
use rag_llm::MockLanguageModel;
use rag_locks::LockManager;
use rag_platform::{
    Customer, DirectoryCredentialResolver, FixtureConnector, FixturePlatform,
    InMemoryTenantDirectory, Order, Product, StoreAnalytics, StoreProfile, TenantRecord,
};
use rag_scheduler::{SchedulerConfig, SchedulerService};
use rag_types::{LockSettings, NamespaceSettings};
use rag_vector::{InMemoryBackend, NamespacedVectorStore, ScoredChunk, VectorBackend, VectorError, VectorRecord};

use crate::manager::NamespaceManager;

/// Namespaces of tenant "42" outside the essential set.
pub(crate) const FAILING_NAMESPACES: [&str; 3] = [
    "tenant-42-orders",
    "tenant-42-customers",
    "tenant-42-analytics",
];

fn platform() -> FixturePlatform {
    let product = |id: &str, name: &str, price: f64| Product {
        id: id.into(),
        name: name.into(),
        price,
        ..Default::default()
    };
    FixturePlatform::new(StoreProfile {
        id: "42".into(),
        name: "Aurora Outfitters".into(),
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
            ..Default::default()
        },
        Order {
            id: "o2".into(),
            status: "pending".into(),
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
        ..Default::default()
    })
}

/// Backend that rejects writes to selected namespaces.
struct RejectingBackend {
    inner: Arc<InMemoryBackend>,
    rejected: HashSet<String>,
}

#[async_trait]
impl VectorBackend for RejectingBackend {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, VectorError> {
        if self.rejected.contains(namespace) {
            return Err(VectorError::Backend(format!("{namespace}: quota exceeded")));
        }
        self.inner.upsert(namespace, records).await
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        self.inner.query(namespace, embedding, top_k).await
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), VectorError> {
        self.inner.delete(namespace, ids).await
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), VectorError> {
        self.inner.delete_all(namespace).await
    }
}

pub(crate) struct Harness {
    pub manager: Arc<NamespaceManager>,
    pub backend: Arc<InMemoryBackend>,
    pub directory: Arc<InMemoryTenantDirectory>,
}

impl Harness {
    /// Tenant "42" (owner "owner-1") with a stored token, no creation delay.
    pub(crate) async fn new() -> Self {
        Self::failing_upserts(&[]).await
    }

    pub(crate) async fn failing_upserts(namespaces: &[&str]) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let rejecting = Arc::new(RejectingBackend {
            inner: backend.clone(),
            rejected: namespaces.iter().map(|n| n.to_string()).collect(),
        });
        let store = Arc::new(NamespacedVectorStore::new(
            rejecting,
            Arc::new(HashingEmbedder::default()),
            64,
        ));
        let directory = Arc::new(InMemoryTenantDirectory::new().with_tenant(
            TenantRecord::new("42", "owner-1")
                .with_access_token("tok-42")
                .with_platform_id("42"),
        ));
        let engine = RagEngine::new(
            store,
            Arc::new(MockLanguageModel::new()),
            Arc::new(FixtureConnector::new().with_default(Arc::new(platform()))),
            Arc::new(DirectoryCredentialResolver::new(directory.clone())),
            directory.clone(),
        );
        let scheduler = SchedulerService::new(SchedulerConfig::default())
            .await
            .unwrap();
        let settings = NamespaceSettings {
            creation_delay_ms: 0,
            manual_sync_wait_ms: 0,
            ..Default::default()
        };
        let manager = NamespaceManager::new(
            Arc::new(engine),
            Arc::new(LockManager::new(LockSettings::default())),
            Arc::new(scheduler),
            settings,
        );

        Self {
            manager,
            backend,
            directory,
        }
    }
}
