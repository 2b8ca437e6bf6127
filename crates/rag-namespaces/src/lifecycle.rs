//! Tenant lifecycle hooks driven by the account layer.

use async_trait::async_trait;
use rag_locks::LockType;
use rag_platform::{Credential, TenantDirectory};
use rag_types::SyncResult;
use tracing::{info, warn};

use crate::error::NamespaceError;
use crate::manager::NamespaceManager;
use crate::state::{BootstrapReport, DeleteReport};

/// Reactions to tenant account events.
#[async_trait]
pub trait TenantLifecycle: Send + Sync {
    /// A store connected for the first time: bootstrap its namespaces,
    /// start the initial sync in the background and schedule refreshes.
    async fn on_connected(&self, store_id: &str) -> Result<BootstrapReport, NamespaceError>;

    /// A store reconnected, possibly with a fresh token. Syncs inline.
    async fn on_reconnected(
        &self,
        store_id: &str,
        credential: Option<Credential>,
    ) -> Result<SyncResult, NamespaceError>;

    /// A store disconnected; its data stays but refreshes stop.
    async fn on_disconnected(&self, store_id: &str) -> Result<(), NamespaceError>;

    /// A store was removed; its namespaces go with it.
    async fn on_deleted(&self, store_id: &str) -> Result<DeleteReport, NamespaceError>;

    /// A dashboard user logged in. Returns how many syncs were started.
    async fn on_user_login(&self, user_id: &str) -> Result<usize, NamespaceError>;
}

#[async_trait]
impl TenantLifecycle for NamespaceManager {
    async fn on_connected(&self, store_id: &str) -> Result<BootstrapReport, NamespaceError> {
        info!(store_id = %store_id, "Store connected");
        self.directory().set_active(store_id, true).await?;

        let report = self.create_namespaces(store_id).await?;
        self.spawn_sync(store_id, "initial-sync");
        self.schedule_periodic_sync(store_id).await?;
        Ok(report)
    }

    async fn on_reconnected(
        &self,
        store_id: &str,
        credential: Option<Credential>,
    ) -> Result<SyncResult, NamespaceError> {
        info!(store_id = %store_id, fresh_token = credential.is_some(), "Store reconnected");
        let directory = self.directory();
        directory.set_active(store_id, true).await?;
        if let Some(credential) = &credential {
            directory
                .set_access_token(store_id, Some(credential.expose().to_string()))
                .await?;
        }

        let result = {
            let _lease = self.locks.acquire_guard(
                store_id,
                LockType::Reconnection,
                "reconnect",
                "store reconnected",
            )?;
            self.create_namespaces(store_id).await?;
            let hint = match credential {
                Some(credential) => Some(credential),
                None => directory
                    .get_tenant(store_id)
                    .await?
                    .and_then(|r| {
                        let platform_id = r.platform_id;
                        r.access_token
                            .map(|t| Credential::new(t).with_platform_id(platform_id))
                    }),
            };
            self.engine.index_tenant_data(store_id, hint).await
        };

        self.record_sync(store_id, &result);
        self.schedule_periodic_sync(store_id).await?;
        Ok(result)
    }

    async fn on_disconnected(&self, store_id: &str) -> Result<(), NamespaceError> {
        info!(store_id = %store_id, "Store disconnected");
        self.directory().set_active(store_id, false).await?;
        self.cancel_periodic_sync(store_id).await?;
        Ok(())
    }

    async fn on_deleted(&self, store_id: &str) -> Result<DeleteReport, NamespaceError> {
        info!(store_id = %store_id, "Store deleted");
        let report = self.delete_namespaces(store_id).await?;
        if let Err(e) = self.directory().set_active(store_id, false).await {
            warn!(store_id = %store_id, error = %e, "Failed to deactivate deleted store");
        }
        Ok(report)
    }

    async fn on_user_login(&self, user_id: &str) -> Result<usize, NamespaceError> {
        let tenants = self.directory().tenants_for_user(user_id).await?;
        let started = tenants
            .iter()
            .filter(|t| t.is_active)
            .filter(|t| self.spawn_sync(&t.store_id, "login-sync"))
            .count();
        info!(user_id = %user_id, tenants = tenants.len(), started, "User login sync");
        Ok(started)
    }
}
