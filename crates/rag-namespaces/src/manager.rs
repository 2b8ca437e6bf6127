//! Namespace manager: bootstrap, deletion and periodic sync per tenant.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use rag_engine::RagEngine;
use rag_locks::{LockError, LockManager, LockType};
use rag_platform::{Credential, TenantDirectory};
use rag_scheduler::{JitterConfig, JobResult, SchedulerService};
use rag_types::{DataType, DocumentChunk, NamespaceKey, NamespaceSettings, SyncResult};
use tracing::{debug, info, warn};

use crate::error::NamespaceError;
use crate::state::{BootstrapReport, DeleteReport, NamespaceState};
use crate::tasks::BackgroundTasks;

/// What a bootstrap inspection found in a namespace.
struct Inspection {
    functional: bool,
    real: bool,
    placeholder: bool,
}

fn sync_job_name(store_id: &str) -> String {
    format!("sync:{store_id}")
}

/// Owns the namespace set of every tenant.
///
/// Construct with [`NamespaceManager::new`], which returns an `Arc`; the
/// periodic sync jobs and background tasks hold weak references back to it.
pub struct NamespaceManager {
    pub(crate) engine: Arc<RagEngine>,
    pub(crate) locks: Arc<LockManager>,
    scheduler: Arc<SchedulerService>,
    pub(crate) settings: NamespaceSettings,
    states: DashMap<String, NamespaceState>,
    pub(crate) tasks: BackgroundTasks,
    pub(crate) this: Weak<NamespaceManager>,
}

impl NamespaceManager {
    pub fn new(
        engine: Arc<RagEngine>,
        locks: Arc<LockManager>,
        scheduler: Arc<SchedulerService>,
        settings: NamespaceSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            engine,
            locks,
            scheduler,
            settings,
            states: DashMap::new(),
            tasks: BackgroundTasks::new(),
            this: this.clone(),
        })
    }

    pub fn engine(&self) -> &Arc<RagEngine> {
        &self.engine
    }

    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn scheduler(&self) -> &Arc<SchedulerService> {
        &self.scheduler
    }

    pub fn background_tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub(crate) fn directory(&self) -> &Arc<dyn TenantDirectory> {
        self.engine.directory()
    }

    pub fn namespace_state(&self, store_id: &str) -> NamespaceState {
        self.states
            .get(store_id)
            .map(|s| *s)
            .unwrap_or_default()
    }

    fn set_state(&self, store_id: &str, state: NamespaceState) {
        let previous = self.states.insert(store_id.to_string(), state);
        if previous != Some(state) {
            debug!(store_id = %store_id, from = ?previous, to = %state, "Namespace state changed");
        }
    }

    /// Make sure every namespace of the tenant holds a functional entry.
    ///
    /// Writes a placeholder only where a namespace is empty; calling it again
    /// writes nothing.
    pub async fn create_namespaces(&self, store_id: &str) -> Result<BootstrapReport, NamespaceError> {
        let previous = self.namespace_state(store_id);
        self.set_state(store_id, NamespaceState::Bootstrapping);
        info!(store_id = %store_id, "Bootstrapping namespaces");

        let store = self.engine.vector_store();
        let delay = Duration::from_millis(self.settings.creation_delay_ms);
        let mut report = BootstrapReport::new(store_id);
        let mut has_real = false;

        for data_type in DataType::ALL {
            let key = NamespaceKey::new(store_id, data_type);
            let found = match self.inspect(&key).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(namespace = %key, error = %e, "Namespace inspection failed");
                    report.failed.insert(data_type, e.to_string());
                    continue;
                }
            };

            if found.functional {
                if found.real && found.placeholder {
                    warn!(namespace = %key, "Stray placeholder next to real documents");
                }
                has_real |= found.real;
                report.existing.push(data_type);
                continue;
            }

            if !report.created.is_empty() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match store
                .add_documents(&key, vec![DocumentChunk::placeholder(&key)])
                .await
            {
                Ok(_) => {
                    debug!(namespace = %key, "Placeholder written");
                    report.created.push(data_type);
                }
                Err(e) => {
                    warn!(namespace = %key, error = %e, "Namespace creation failed");
                    report.failed.insert(data_type, e.to_string());
                }
            }
        }

        let succeeded = report.succeeded();
        let required = self.settings.min_successful_types.min(DataType::ALL.len());
        let essential_ok = self
            .settings
            .essential_types
            .iter()
            .any(|t| succeeded.contains(t));

        if succeeded.len() < required || !essential_ok {
            warn!(
                store_id = %store_id,
                succeeded = succeeded.len(),
                required,
                essential_ok,
                "Namespace bootstrap failed"
            );
            let restored = match previous {
                NamespaceState::Bootstrapping => NamespaceState::Uninitialized,
                other => other,
            };
            self.set_state(store_id, restored);
            return Err(NamespaceError::BootstrapFailed {
                store_id: store_id.to_string(),
                succeeded: succeeded.len(),
                errors: report.failed,
            });
        }

        if !report.failed.is_empty() {
            warn!(store_id = %store_id, failed = ?report.failed.keys().collect::<Vec<_>>(), "Bootstrap tolerated partial failure");
        }
        let state = if has_real || previous == NamespaceState::Indexed {
            NamespaceState::Indexed
        } else {
            NamespaceState::Placeholder
        };
        self.set_state(store_id, state);
        info!(
            store_id = %store_id,
            created = report.created.len(),
            existing = report.existing.len(),
            "Namespaces ready"
        );
        Ok(report)
    }

    async fn inspect(&self, key: &NamespaceKey) -> Result<Inspection, rag_engine::RagError> {
        let hits = self
            .engine
            .vector_store()
            .similarity_search_with_score(key, &self.settings.inspection_query, 2)
            .await?;
        Ok(Inspection {
            functional: !hits.is_empty(),
            real: hits.iter().any(|h| !h.chunk.is_placeholder()),
            placeholder: hits.iter().any(|h| h.chunk.is_placeholder()),
        })
    }

    /// Remove every namespace of the tenant under a deletion lease.
    ///
    /// Continues past per-namespace failures and cancels the periodic sync.
    pub async fn delete_namespaces(&self, store_id: &str) -> Result<DeleteReport, NamespaceError> {
        let _lease = self.locks.acquire_guard(
            store_id,
            LockType::Deletion,
            "delete-namespaces",
            "store removed",
        )?;
        info!(store_id = %store_id, "Deleting namespaces");

        let sync_cancelled = match self.cancel_periodic_sync(store_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "Failed to cancel periodic sync");
                false
            }
        };

        let mut report = DeleteReport {
            store_id: store_id.to_string(),
            sync_cancelled,
            ..Default::default()
        };
        for key in NamespaceKey::all_for(store_id) {
            match self.engine.vector_store().delete_all(&key).await {
                Ok(()) => report.deleted.push(key.data_type),
                Err(e) => {
                    warn!(namespace = %key, error = %e, "Namespace deletion failed");
                    report.failed.insert(key.data_type, e.to_string());
                }
            }
        }

        let evicted = self.engine.forget_tenant(store_id);
        self.set_state(store_id, NamespaceState::Deleted);
        info!(
            store_id = %store_id,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            evicted,
            "Namespaces deleted"
        );
        Ok(report)
    }

    /// Re-sync the tenant every `sync_interval_secs`, replacing any
    /// existing job for it.
    pub async fn schedule_periodic_sync(&self, store_id: &str) -> Result<(), NamespaceError> {
        let manager = self.this.clone();
        let store = store_id.to_string();
        let every = Duration::from_secs(self.settings.sync_interval_secs);
        let jitter = JitterConfig::new(self.settings.sync_jitter_secs);

        self.scheduler
            .add_interval_job(&sync_job_name(store_id), every, jitter, move |_token| {
                let manager = manager.clone();
                let store = store.clone();
                async move {
                    match manager.upgrade() {
                        Some(manager) => manager.periodic_sync(&store).await,
                        None => JobResult::Skipped("namespace manager dropped".to_string()),
                    }
                }
            })
            .await?;
        info!(store_id = %store_id, interval_secs = every.as_secs(), "Periodic sync scheduled");
        Ok(())
    }

    /// Returns whether a job was scheduled.
    pub async fn cancel_periodic_sync(&self, store_id: &str) -> Result<bool, NamespaceError> {
        let removed = self.scheduler.remove_job(&sync_job_name(store_id)).await?;
        if removed {
            info!(store_id = %store_id, "Periodic sync cancelled");
        }
        Ok(removed)
    }

    pub fn has_periodic_sync(&self, store_id: &str) -> bool {
        self.scheduler.has_job(&sync_job_name(store_id))
    }

    /// Timer tick: the manual-tier sync of [`Self::trigger_sync`], skipped
    /// rather than delayed when the tenant is busy.
    async fn periodic_sync(&self, store_id: &str) -> JobResult {
        match self
            .sync_with_lease(store_id, LockType::ManualSync, "periodic-sync", "scheduled re-sync", None)
            .await
        {
            Ok(result) if result.success => JobResult::Success,
            Ok(result) => JobResult::Failed(result.error.unwrap_or_else(|| "sync failed".to_string())),
            Err(e) if e.is_lock_conflict() => JobResult::Skipped(e.to_string()),
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }

    /// User-requested sync at `ManualSync` priority. A busy tenant is given
    /// `manual_sync_wait_ms` to free up before the conflict is returned.
    pub async fn trigger_sync(&self, store_id: &str) -> Result<SyncResult, NamespaceError> {
        let wait = Duration::from_millis(self.settings.manual_sync_wait_ms);
        if !wait.is_zero() {
            if let Err(e) = self
                .locks
                .wait_for_availability(store_id, LockType::ManualSync, wait)
                .await
            {
                debug!(store_id = %store_id, error = %e, "Tenant still busy after waiting");
            }
        }
        self.sync_with_lease(store_id, LockType::ManualSync, "manual-sync", "sync requested", None)
            .await
    }

    /// Run one ingestion under a lease of `lock_type`. The lease is released
    /// when this returns, whatever the outcome.
    pub(crate) async fn sync_with_lease(
        &self,
        store_id: &str,
        lock_type: LockType,
        operation: &str,
        reason: &str,
        credential: Option<Credential>,
    ) -> Result<SyncResult, NamespaceError> {
        let check = self.locks.check_conflicts(store_id, lock_type);
        if !check.can_proceed {
            info!(
                store_id = %store_id,
                lock_type = %lock_type,
                reason = check.reason.as_deref().unwrap_or_default(),
                "Sync skipped, tenant busy"
            );
            return Err(LockError::Conflict {
                store_id: store_id.to_string(),
                requested: lock_type,
                blocking_leases: check.blocking_leases,
                reason: check.reason.unwrap_or_default(),
            }
            .into());
        }
        let _lease = self.locks.acquire_guard(store_id, lock_type, operation, reason)?;

        let hint = match credential {
            Some(credential) => Some(credential),
            None => self.current_credential(store_id).await?,
        };

        let result = self.engine.index_tenant_data(store_id, hint).await;
        self.record_sync(store_id, &result);
        Ok(result)
    }

    /// Advance the tenant's state after an ingestion run.
    pub(crate) fn record_sync(&self, store_id: &str, result: &SyncResult) {
        if result.success {
            let state = self.namespace_state(store_id).after_sync(result.documents_indexed);
            self.set_state(store_id, state);
        } else {
            warn!(store_id = %store_id, error = ?result.error, "Sync failed");
        }
    }

    /// The credential stored on the tenant record right now.
    async fn current_credential(&self, store_id: &str) -> Result<Option<Credential>, NamespaceError> {
        let record = self
            .directory()
            .get_tenant(store_id)
            .await?
            .ok_or_else(|| NamespaceError::UnknownTenant(store_id.to_string()))?;
        if !record.is_active {
            return Err(NamespaceError::TenantInactive(store_id.to_string()));
        }
        Ok(record
            .access_token
            .filter(|t| !t.is_empty())
            .map(|t| Credential::new(t).with_platform_id(record.platform_id)))
    }

    /// Start a fire-and-forget sync at `BackgroundSync` priority (no-op if
    /// the tenant is busy).
    pub(crate) fn spawn_sync(&self, store_id: &str, operation: &'static str) -> bool {
        if !self.locks.check_conflicts(store_id, LockType::BackgroundSync).can_proceed {
            debug!(store_id = %store_id, operation, "Tenant busy, not spawning sync");
            return false;
        }
        let Some(manager) = self.this.upgrade() else {
            return false;
        };
        let store = store_id.to_string();
        self.tasks.spawn(operation, async move {
            manager
                .sync_with_lease(&store, LockType::BackgroundSync, operation, "background sync", None)
                .await
                .map(|_| ())
        });
        true
    }
}
