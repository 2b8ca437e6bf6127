//! Ingestion: pull a tenant's platform data into its namespaces.
//!
//! A run resolves a credential, tests connectivity, then fetches the five
//! upstream data types concurrently. A failure on one type contributes zero
//! documents and never aborts the others. Runs are single-flight per tenant:
//! callers arriving while a run is active await that run's result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use rag_platform::{Credential, PlatformApi, PlatformError};
use rag_types::{DataType, DocumentChunk, NamespaceKey, SyncResult, TypeOutcome};
use tracing::{debug, info, warn};

use crate::engine::RagEngine;
use crate::error::RagError;
use crate::memory::ConversationTurn;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl RagEngine {
    /// Index all upstream data of a tenant.
    ///
    /// Never fails: fatal problems (no credential, platform unreachable)
    /// come back as `success = false` with `error` set.
    pub async fn index_tenant_data(
        self: &Arc<Self>,
        store_id: &str,
        credential_hint: Option<Credential>,
    ) -> SyncResult {
        let run = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(store_id) {
                Some(run) => {
                    debug!(store_id = %store_id, "Joining in-flight ingestion run");
                    run.clone()
                }
                None => {
                    let engine = Arc::clone(self);
                    let store = store_id.to_string();
                    let run = async move {
                        let result = engine.run_ingestion(&store, credential_hint.as_ref()).await;
                        engine
                            .inflight
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .remove(&store);
                        result
                    }
                    .boxed()
                    .shared();
                    inflight.insert(store_id.to_string(), run.clone());
                    run
                }
            }
        };
        run.await
    }

    async fn run_ingestion(&self, store_id: &str, hint: Option<&Credential>) -> SyncResult {
        let start = Instant::now();
        info!(store_id = %store_id, "Starting ingestion run");

        let platform = match self.open_platform(store_id, hint).await {
            Ok(platform) => platform,
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "Ingestion aborted");
                return SyncResult::failed(e.to_string(), elapsed_ms(start));
            }
        };
        let platform = platform.as_ref();
        let limits = &self.ingestion;

        let (store, products, orders, customers, analytics) = tokio::join!(
            async {
                let fetched = platform
                    .get_store()
                    .await
                    .map(|s| self.processor.process_store(store_id, &s));
                self.write_type(store_id, DataType::Store, fetched).await
            },
            async {
                let fetched = platform
                    .get_products(limits.product_page_size)
                    .await
                    .map(|p| self.processor.process_products(store_id, &p));
                self.write_type(store_id, DataType::Products, fetched).await
            },
            async {
                let fetched = platform
                    .get_orders(limits.order_page_size)
                    .await
                    .map(|o| self.processor.process_orders(store_id, &o));
                self.write_type(store_id, DataType::Orders, fetched).await
            },
            async {
                let fetched = platform
                    .get_customers(limits.customer_page_size)
                    .await
                    .map(|c| self.processor.process_customers(store_id, &c));
                self.write_type(store_id, DataType::Customers, fetched).await
            },
            async {
                let fetched = platform
                    .get_store_analytics()
                    .await
                    .map(|a| self.processor.process_analytics(store_id, &a));
                self.write_type(store_id, DataType::Analytics, fetched).await
            },
        );

        let mut result = SyncResult {
            success: true,
            ..Default::default()
        };
        result.record(DataType::Store, store);
        result.record(DataType::Products, products);
        result.record(DataType::Orders, orders);
        result.record(DataType::Customers, customers);
        result.record(DataType::Analytics, analytics);

        if result.documents_indexed > 0 {
            let types = result.namespaces_processed.clone();
            self.remove_placeholders(store_id, &types).await;
        }

        if let Err(e) = self.directory.touch_last_sync(store_id, Utc::now()).await {
            warn!(store_id = %store_id, error = %e, "Failed to record last sync time");
        }

        result.processing_time_ms = elapsed_ms(start);
        info!(
            store_id = %store_id,
            documents = result.documents_indexed,
            namespaces = result.namespaces_processed.len(),
            failed_types = ?result.failed_types(),
            duration_ms = result.processing_time_ms,
            "Ingestion run complete"
        );
        result
    }

    /// Resolve a credential, connect, and run the connectivity test.
    async fn open_platform(
        &self,
        store_id: &str,
        hint: Option<&Credential>,
    ) -> Result<Arc<dyn PlatformApi>, RagError> {
        let credential = self.credentials.resolve(store_id, hint).await?;

        let platform = self
            .connector
            .connect(&credential)
            .map_err(|e| connection_error(store_id, e))?;

        let timeout = Duration::from_secs(self.ingestion.connectivity_timeout_secs);
        match tokio::time::timeout(timeout, platform.test_connection()).await {
            Ok(Ok(())) => Ok(platform),
            Ok(Err(e)) => Err(connection_error(store_id, e)),
            Err(_) => Err(RagError::Connectivity {
                store_id: store_id.to_string(),
                reason: format!("connectivity test timed out after {}s", timeout.as_secs()),
            }),
        }
    }

    async fn write_type(
        &self,
        store_id: &str,
        data_type: DataType,
        fetched: Result<Vec<DocumentChunk>, PlatformError>,
    ) -> TypeOutcome {
        let chunks = match fetched {
            Ok(chunks) => chunks,
            Err(e) => {
                if e.is_feature_unavailable() {
                    info!(store_id = %store_id, data_type = %data_type, error = %e, "Data type unavailable for store");
                } else {
                    warn!(store_id = %store_id, data_type = %data_type, error = %e, "Fetch failed");
                }
                return TypeOutcome {
                    documents: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let key = NamespaceKey::new(store_id, data_type);
        let ids: HashSet<String> = chunks.iter().map(|c| c.id.clone()).collect();
        if chunks.is_empty() {
            debug!(store_id = %store_id, data_type = %data_type, "No records");
            self.prune_stale(&key, ids).await;
            return TypeOutcome::default();
        }

        match self.store.add_documents(&key, chunks).await {
            Ok(documents) => {
                self.prune_stale(&key, ids).await;
                TypeOutcome {
                    documents,
                    error: None,
                }
            }
            Err(e) => {
                warn!(namespace = %key, error = %e, "Indexing failed");
                TypeOutcome {
                    documents: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Delete chunks the previous write produced that this one did not.
    ///
    /// Covers records removed upstream and records that now split into fewer
    /// `-part-{n}` chunks. The ledger lives in memory, so the first run after
    /// a restart prunes nothing.
    async fn prune_stale(&self, key: &NamespaceKey, current: HashSet<String>) {
        let previous = self
            .written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), current.clone());
        let Some(previous) = previous else {
            return;
        };

        let stale: Vec<String> = previous.difference(&current).cloned().collect();
        if stale.is_empty() {
            return;
        }
        match self.store.delete(key, &stale).await {
            Ok(()) => debug!(namespace = %key, removed = stale.len(), "Stale chunks removed"),
            Err(e) => warn!(namespace = %key, error = %e, "Stale chunk removal failed"),
        }
    }

    /// Delete the placeholder of each type that now holds real documents.
    async fn remove_placeholders(&self, store_id: &str, types: &[DataType]) {
        for data_type in types {
            let key = NamespaceKey::new(store_id, *data_type);
            match self.store.delete(&key, &[key.placeholder_id()]).await {
                Ok(()) => debug!(namespace = %key, "Placeholder removed"),
                Err(e) => warn!(namespace = %key, error = %e, "Placeholder removal failed"),
            }
        }
    }

    /// Remember a conversation turn and index it into the tenant's
    /// `conversations` namespace.
    pub async fn record_conversation_turn(
        &self,
        store_id: &str,
        conversation_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<ConversationTurn, RagError> {
        let turn = self
            .memory
            .record(store_id, conversation_id, user_message, assistant_message);
        let chunks = self
            .processor
            .process_conversation_turn(store_id, conversation_id, &turn);

        let key = NamespaceKey::new(store_id, DataType::Conversations);
        self.store.add_documents(&key, chunks).await?;
        if turn.turn == 1 {
            self.remove_placeholders(store_id, &[DataType::Conversations])
                .await;
        }
        Ok(turn)
    }
}

fn connection_error(store_id: &str, error: PlatformError) -> RagError {
    match error {
        PlatformError::Unauthorized(reason) => RagError::CredentialInvalid {
            store_id: store_id.to_string(),
            reason,
        },
        other => RagError::Connectivity {
            store_id: store_id.to_string(),
            reason: other.to_string(),
        },
    }
}
