//! Bounded cache of namespace client handles.
//!
//! Keyed by `(store_id, data_type)`; never shared across tenants because the
//! key always carries the store id.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rag_types::{DataType, NamespaceKey};

use crate::store::NamespaceClient;

/// LRU of [`NamespaceClient`] handles.
pub struct ClientCache {
    inner: Mutex<LruCache<(String, DataType), Arc<NamespaceClient>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ClientCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached handle or build and insert one.
    pub fn get_or_insert<F>(&self, key: &NamespaceKey, build: F) -> Arc<NamespaceClient>
    where
        F: FnOnce() -> NamespaceClient,
    {
        let cache_key = (key.store_id.clone(), key.data_type);
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(client) = cache.get(&cache_key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return client.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let client = Arc::new(build());
        cache.put(cache_key, client.clone());
        client
    }

    /// Remove every handle belonging to a tenant. Returns how many were dropped.
    pub fn evict_tenant(&self, store_id: &str) -> usize {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let keys: Vec<(String, DataType)> = cache
            .iter()
            .filter(|((sid, _), _)| sid == store_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            cache.pop(key);
        }
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use rag_embeddings::HashingEmbedder;

    fn build(key: &NamespaceKey) -> NamespaceClient {
        NamespaceClient::new(
            key.clone(),
            Arc::new(InMemoryBackend::new()),
            Arc::new(HashingEmbedder::new(8)),
        )
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ClientCache::new(2);
        for dt in [DataType::Store, DataType::Products, DataType::Orders] {
            let key = NamespaceKey::new("s1", dt);
            cache.get_or_insert(&key, || build(&key));
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats(), (0, 3));
    }

    #[test]
    fn test_hit_returns_same_handle() {
        let cache = ClientCache::new(4);
        let key = NamespaceKey::new("s1", DataType::Store);
        let a = cache.get_or_insert(&key, || build(&key));
        let b = cache.get_or_insert(&key, || build(&key));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_evict_tenant_leaves_others() {
        let cache = ClientCache::new(8);
        for store in ["s1", "s2"] {
            for dt in [DataType::Store, DataType::Products] {
                let key = NamespaceKey::new(store, dt);
                cache.get_or_insert(&key, || build(&key));
            }
        }
        assert_eq!(cache.evict_tenant("s1"), 2);
        assert_eq!(cache.len(), 2);
    }
}
