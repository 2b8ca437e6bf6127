//! Tenant record store.
//!
//! The relational database that owns tenant rows is an external
//! collaborator; [`TenantDirectory`] is the narrow slice the RAG subsystem
//! reads and writes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rag_types::TenantSeed;
use tracing::debug;

use crate::error::PlatformError;

/// One tenant (store) row.
#[derive(Clone, PartialEq)]
pub struct TenantRecord {
    pub store_id: String,
    /// Owning dashboard user
    pub user_id: String,
    /// Platform-side merchant id
    pub platform_id: Option<String>,
    pub access_token: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl TenantRecord {
    pub fn new(store_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            user_id: user_id.into(),
            platform_id: None,
            access_token: None,
            is_active: true,
            last_sync_at: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_platform_id(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl From<&TenantSeed> for TenantRecord {
    fn from(seed: &TenantSeed) -> Self {
        Self {
            store_id: seed.store_id.clone(),
            user_id: seed.user_id.clone(),
            platform_id: seed.platform_id.clone(),
            access_token: seed.access_token.clone(),
            is_active: seed.is_active,
            last_sync_at: None,
        }
    }
}

impl fmt::Debug for TenantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRecord")
            .field("store_id", &self.store_id)
            .field("user_id", &self.user_id)
            .field("platform_id", &self.platform_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("is_active", &self.is_active)
            .field("last_sync_at", &self.last_sync_at)
            .finish()
    }
}

/// Read/write access to tenant rows.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get_tenant(&self, store_id: &str) -> Result<Option<TenantRecord>, PlatformError>;

    /// Insert or replace a tenant row.
    async fn upsert_tenant(&self, record: TenantRecord) -> Result<(), PlatformError>;

    async fn set_active(&self, store_id: &str, active: bool) -> Result<(), PlatformError>;

    async fn set_access_token(
        &self,
        store_id: &str,
        token: Option<String>,
    ) -> Result<(), PlatformError>;

    async fn touch_last_sync(&self, store_id: &str, at: DateTime<Utc>) -> Result<(), PlatformError>;

    /// Stores owned by a dashboard user.
    async fn tenants_for_user(&self, user_id: &str) -> Result<Vec<TenantRecord>, PlatformError>;

    async fn active_tenants(&self) -> Result<Vec<TenantRecord>, PlatformError>;
}

/// DashMap-backed tenant directory.
#[derive(Default)]
pub struct InMemoryTenantDirectory {
    records: DashMap<String, TenantRecord>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[[tenants]]` config section.
    pub fn from_seeds(seeds: &[TenantSeed]) -> Self {
        let directory = Self::new();
        for seed in seeds {
            directory
                .records
                .insert(seed.store_id.clone(), TenantRecord::from(seed));
        }
        directory
    }

    pub fn with_tenant(self, record: TenantRecord) -> Self {
        self.records.insert(record.store_id.clone(), record);
        self
    }

    fn update<F>(&self, store_id: &str, f: F) -> Result<(), PlatformError>
    where
        F: FnOnce(&mut TenantRecord),
    {
        let mut record = self
            .records
            .get_mut(store_id)
            .ok_or_else(|| PlatformError::NotFound(format!("tenant {store_id}")))?;
        f(&mut record);
        Ok(())
    }
}

fn sorted(mut records: Vec<TenantRecord>) -> Vec<TenantRecord> {
    records.sort_by(|a, b| a.store_id.cmp(&b.store_id));
    records
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn get_tenant(&self, store_id: &str) -> Result<Option<TenantRecord>, PlatformError> {
        Ok(self.records.get(store_id).map(|r| r.clone()))
    }

    async fn upsert_tenant(&self, record: TenantRecord) -> Result<(), PlatformError> {
        debug!(store_id = %record.store_id, "Upserting tenant record");
        self.records.insert(record.store_id.clone(), record);
        Ok(())
    }

    async fn set_active(&self, store_id: &str, active: bool) -> Result<(), PlatformError> {
        self.update(store_id, |r| r.is_active = active)
    }

    async fn set_access_token(
        &self,
        store_id: &str,
        token: Option<String>,
    ) -> Result<(), PlatformError> {
        self.update(store_id, |r| r.access_token = token)
    }

    async fn touch_last_sync(&self, store_id: &str, at: DateTime<Utc>) -> Result<(), PlatformError> {
        self.update(store_id, |r| r.last_sync_at = Some(at))
    }

    async fn tenants_for_user(&self, user_id: &str) -> Result<Vec<TenantRecord>, PlatformError> {
        Ok(sorted(
            self.records
                .iter()
                .filter(|r| r.user_id == user_id)
                .map(|r| r.clone())
                .collect(),
        ))
    }

    async fn active_tenants(&self) -> Result<Vec<TenantRecord>, PlatformError> {
        Ok(sorted(
            self.records
                .iter()
                .filter(|r| r.is_active)
                .map(|r| r.clone())
                .collect(),
        ))
    }
}
