//! Namespaced vector store: embedding plus backend access per namespace key.

use std::sync::Arc;

use rag_embeddings::{Embedding, EmbeddingModel};
use rag_types::{DocumentChunk, NamespaceKey};
use tracing::debug;

use crate::backend::{ScoredChunk, VectorBackend, VectorRecord};
use crate::cache::ClientCache;
use crate::error::VectorError;

/// Handle bound to one tenant namespace.
pub struct NamespaceClient {
    key: NamespaceKey,
    name: String,
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl NamespaceClient {
    pub fn new(
        key: NamespaceKey,
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        let name = key.to_string();
        Self {
            key,
            name,
            backend,
            embedder,
        }
    }

    pub fn key(&self) -> &NamespaceKey {
        &self.key
    }

    /// Backend namespace name (`tenant-{id}` / `tenant-{id}-{type}`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embed and upsert chunks. Returns the number written.
    pub async fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<usize, VectorError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(VectorError::Backend(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord::new(chunk, embedding))
            .collect();
        let written = self.backend.upsert(&self.name, records).await?;
        debug!(namespace = %self.name, written, "Indexed documents");
        Ok(written)
    }

    /// Embed the query and return up to `k` scored chunks.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        let embedding = self.embedder.embed(query).await?;
        self.similarity_search_by_embedding(&embedding, k).await
    }

    /// Query with a precomputed embedding (multi-namespace fan-out).
    pub async fn similarity_search_by_embedding(
        &self,
        embedding: &Embedding,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.backend.query(&self.name, embedding, k).await
    }

    pub async fn delete(&self, ids: &[String]) -> Result<(), VectorError> {
        self.backend.delete(&self.name, ids).await
    }

    pub async fn delete_all(&self) -> Result<(), VectorError> {
        self.backend.delete_all(&self.name).await
    }
}

/// Entry point for all namespace operations.
///
/// Owns the backend, the embedder, and the bounded client cache.
pub struct NamespacedVectorStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn EmbeddingModel>,
    cache: ClientCache,
}

impl NamespacedVectorStore {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn EmbeddingModel>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            backend,
            embedder,
            cache: ClientCache::new(cache_capacity),
        }
    }

    /// Cached client handle for a namespace.
    pub fn namespace(&self, key: &NamespaceKey) -> Arc<NamespaceClient> {
        self.cache.get_or_insert(key, || {
            NamespaceClient::new(key.clone(), self.backend.clone(), self.embedder.clone())
        })
    }

    /// Embed a query once for use across several namespaces.
    pub async fn embed_query(&self, query: &str) -> Result<Embedding, VectorError> {
        Ok(self.embedder.embed(query).await?)
    }

    pub async fn add_documents(
        &self,
        key: &NamespaceKey,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize, VectorError> {
        self.namespace(key).add_documents(chunks).await
    }

    pub async fn similarity_search_with_score(
        &self,
        key: &NamespaceKey,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        self.namespace(key).similarity_search_with_score(query, k).await
    }

    pub async fn delete(&self, key: &NamespaceKey, ids: &[String]) -> Result<(), VectorError> {
        self.namespace(key).delete(ids).await
    }

    pub async fn delete_all(&self, key: &NamespaceKey) -> Result<(), VectorError> {
        self.namespace(key).delete_all().await
    }

    /// Drop cached handles for a tenant (after deletion).
    pub fn evict_tenant(&self, store_id: &str) -> usize {
        self.cache.evict_tenant(store_id)
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use rag_embeddings::HashingEmbedder;
    use rag_types::{ChunkMetadata, DataType};

    fn store() -> (Arc<InMemoryBackend>, NamespacedVectorStore) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = NamespacedVectorStore::new(
            backend.clone(),
            Arc::new(HashingEmbedder::default()),
            8,
        );
        (backend, store)
    }

    fn product(id: &str, text: &str) -> DocumentChunk {
        DocumentChunk::new(
            format!("product-{id}"),
            text,
            ChunkMetadata::new(DataType::Products, "s1", "platform"),
        )
    }

    #[tokio::test]
    async fn test_add_and_search_by_key() {
        let (backend, store) = store();
        let key = NamespaceKey::new("s1", DataType::Products);
        store
            .add_documents(
                &key,
                vec![
                    product("1", "Product: Blue cotton shirt"),
                    product("2", "Product: Leather wallet"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(backend.namespace_len("tenant-s1-products"), 2);

        let results = store
            .similarity_search_with_score(&key, "cotton shirt", 1)
            .await
            .unwrap();
        assert_eq!(results[0].chunk.id, "product-1");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_namespace_handles_are_cached() {
        let (_, store) = store();
        let key = NamespaceKey::new("s1", DataType::Orders);
        let a = store.namespace(&key);
        let b = store.namespace(&key);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "tenant-s1-orders");
    }

    #[tokio::test]
    async fn test_zero_k_returns_nothing() {
        let (_, store) = store();
        let key = NamespaceKey::new("s1", DataType::Products);
        store
            .add_documents(&key, vec![product("1", "Product: shirt")])
            .await
            .unwrap();
        let results = store.similarity_search_with_score(&key, "shirt", 0).await.unwrap();
        assert!(results.is_empty());
    }
}
