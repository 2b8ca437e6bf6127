//! Credential resolution.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::Credential;
use crate::error::PlatformError;
use crate::tenants::TenantDirectory;

/// Primary source of fresh credentials (token refresh service).
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// A usable credential for the store, or `None` if it has none.
    async fn get_valid_credential(&self, store_id: &str)
        -> Result<Option<Credential>, PlatformError>;
}

/// Resolver reading the access token stored on active tenant records.
pub struct DirectoryCredentialResolver {
    directory: Arc<dyn TenantDirectory>,
}

impl DirectoryCredentialResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl CredentialResolver for DirectoryCredentialResolver {
    async fn get_valid_credential(
        &self,
        store_id: &str,
    ) -> Result<Option<Credential>, PlatformError> {
        let Some(record) = self.directory.get_tenant(store_id).await? else {
            return Ok(None);
        };
        if !record.is_active {
            return Ok(None);
        }
        Ok(record
            .access_token
            .filter(|t| !t.is_empty())
            .map(|t| Credential::new(t).with_platform_id(record.platform_id)))
    }
}
