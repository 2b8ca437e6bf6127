//! In-process vector backend.
//!
//! Brute-force cosine search over a DashMap of namespaces. Good enough for a
//! few thousand chunks per tenant and fully deterministic for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use rag_embeddings::Embedding;
use tracing::debug;

use crate::backend::{ScoredChunk, VectorBackend, VectorRecord};
use crate::error::VectorError;

/// DashMap-backed vector backend.
#[derive(Default)]
pub struct InMemoryBackend {
    namespaces: DashMap<String, HashMap<String, VectorRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace (0 if it does not exist).
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map(|ns| ns.len()).unwrap_or(0)
    }

    /// Sorted ids stored in a namespace.
    pub fn ids(&self, namespace: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .namespaces
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Names of non-empty namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorError> {
        let count = records.len();
        let mut ns = self.namespaces.entry(namespace.to_string()).or_default();

        if let Some(expected) = ns.values().next().map(|r| r.embedding.dimension()) {
            if let Some(bad) = records.iter().find(|r| r.embedding.dimension() != expected) {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.dimension(),
                });
            }
        }

        for record in records {
            ns.insert(record.chunk.id.clone(), record);
        }
        debug!(namespace, count, "Upserted records");
        Ok(count)
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, VectorError> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = ns
            .values()
            .map(|r| ScoredChunk::new(r.chunk.clone(), r.embedding.cosine_similarity(embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), VectorError> {
        if let Some(mut ns) = self.namespaces.get_mut(namespace) {
            for id in ids {
                ns.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), VectorError> {
        self.namespaces.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_types::{ChunkMetadata, DataType, DocumentChunk};

    fn record(id: &str, values: Vec<f32>) -> VectorRecord {
        let chunk = DocumentChunk::new(
            id,
            format!("content of {id}"),
            ChunkMetadata::new(DataType::Products, "s1", "platform"),
        );
        VectorRecord::new(chunk, Embedding::new(values))
    }

    #[tokio::test]
    async fn test_query_sorted_best_first() {
        let backend = InMemoryBackend::new();
        backend
            .upsert(
                "tenant-s1-products",
                vec![
                    record("far", vec![0.0, 1.0]),
                    record("near", vec![1.0, 0.1]),
                    record("mid", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = backend
            .query("tenant-s1-products", &Embedding::new(vec![1.0, 0.0]), 2)
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let backend = InMemoryBackend::new();
        backend.upsert("ns", vec![record("a", vec![1.0, 0.0])]).await.unwrap();
        backend.upsert("ns", vec![record("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(backend.namespace_len("ns"), 1);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let backend = InMemoryBackend::new();
        backend.upsert("tenant-a", vec![record("x", vec![1.0])]).await.unwrap();
        let results = backend
            .query("tenant-b", &Embedding::new(vec![1.0]), 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let backend = InMemoryBackend::new();
        backend
            .upsert("ns", vec![record("a", vec![1.0]), record("b", vec![1.0])])
            .await
            .unwrap();
        backend.delete("ns", &["a".to_string(), "missing".to_string()]).await.unwrap();
        assert_eq!(backend.ids("ns"), vec!["b".to_string()]);

        backend.delete_all("ns").await.unwrap();
        backend.delete_all("never-existed").await.unwrap();
        assert_eq!(backend.namespace_len("ns"), 0);
        assert!(backend.namespaces().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let backend = InMemoryBackend::new();
        backend.upsert("ns", vec![record("a", vec![1.0, 0.0])]).await.unwrap();
        let err = backend
            .upsert("ns", vec![record("b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { expected: 2, actual: 3 }));
    }
}
