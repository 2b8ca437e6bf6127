//! Three-tier credential resolution for ingestion runs.

use std::sync::Arc;

use rag_platform::{Credential, CredentialResolver, TenantDirectory};
use tracing::{debug, warn};

use crate::error::RagError;

/// Resolves the platform credential for a tenant.
///
/// First success wins:
/// 1. the [`CredentialResolver`] (token refresh aware)
/// 2. the caller's hint, if the tenant record exists and is active
/// 3. the access token stored on an active tenant record
pub struct CredentialChain {
    resolver: Arc<dyn CredentialResolver>,
    directory: Arc<dyn TenantDirectory>,
}

impl CredentialChain {
    pub fn new(resolver: Arc<dyn CredentialResolver>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            resolver,
            directory,
        }
    }

    pub async fn resolve(
        &self,
        store_id: &str,
        hint: Option<&Credential>,
    ) -> Result<Credential, RagError> {
        match self.resolver.get_valid_credential(store_id).await {
            Ok(Some(credential)) => {
                debug!(store_id = %store_id, "Credential from resolver");
                return Ok(credential);
            }
            Ok(None) => debug!(store_id = %store_id, "Resolver has no credential"),
            Err(e) => warn!(store_id = %store_id, error = %e, "Credential resolver failed"),
        }

        let record = match self.directory.get_tenant(store_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "Tenant lookup failed");
                None
            }
        };
        let Some(record) = record.filter(|r| r.is_active) else {
            return Err(RagError::CredentialInvalid {
                store_id: store_id.to_string(),
                reason: "tenant record missing or inactive".to_string(),
            });
        };

        if let Some(hint) = hint {
            debug!(store_id = %store_id, "Credential from caller hint");
            let platform_id = hint.platform_id.clone().or(record.platform_id.clone());
            return Ok(hint.clone().with_platform_id(platform_id));
        }

        match record.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!(store_id = %store_id, "Credential from stored token");
                Ok(Credential::new(token).with_platform_id(record.platform_id))
            }
            None => Err(RagError::CredentialInvalid {
                store_id: store_id.to_string(),
                reason: "no access token on record".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_platform::{InMemoryTenantDirectory, PlatformError, TenantRecord};

    struct FixedResolver(Option<&'static str>);

    #[async_trait]
    impl CredentialResolver for FixedResolver {
        async fn get_valid_credential(
            &self,
            _store_id: &str,
        ) -> Result<Option<Credential>, PlatformError> {
            Ok(self.0.map(Credential::new))
        }
    }

    struct BrokenResolver;

    #[async_trait]
    impl CredentialResolver for BrokenResolver {
        async fn get_valid_credential(
            &self,
            _store_id: &str,
        ) -> Result<Option<Credential>, PlatformError> {
            Err(PlatformError::Timeout)
        }
    }

    fn directory() -> Arc<dyn TenantDirectory> {
        Arc::new(
            InMemoryTenantDirectory::new()
                .with_tenant(
                    TenantRecord::new("active", "u1")
                        .with_access_token("stored")
                        .with_platform_id("p-active"),
                )
                .with_tenant(TenantRecord::new("no-token", "u1"))
                .with_tenant(TenantRecord::new("gone", "u1").with_access_token("old").inactive()),
        )
    }

    #[tokio::test]
    async fn test_resolver_wins() {
        let chain = CredentialChain::new(Arc::new(FixedResolver(Some("fresh"))), directory());
        let hint = Credential::new("hint");
        let credential = chain.resolve("active", Some(&hint)).await.unwrap();
        assert_eq!(credential.expose(), "fresh");
    }

    #[tokio::test]
    async fn test_hint_then_stored_token() {
        let chain = CredentialChain::new(Arc::new(BrokenResolver), directory());

        let hint = Credential::new("hint");
        let credential = chain.resolve("active", Some(&hint)).await.unwrap();
        assert_eq!(credential.expose(), "hint");
        assert_eq!(credential.platform_id.as_deref(), Some("p-active"));

        let credential = chain.resolve("active", None).await.unwrap();
        assert_eq!(credential.expose(), "stored");
    }

    #[tokio::test]
    async fn test_all_tiers_fail() {
        let chain = CredentialChain::new(Arc::new(FixedResolver(None)), directory());

        let err = chain.resolve("no-token", None).await.unwrap_err();
        assert!(err.needs_reconnection());

        let hint = Credential::new("hint");
        let err = chain.resolve("gone", Some(&hint)).await.unwrap_err();
        assert!(err.needs_reconnection());

        let err = chain.resolve("unknown", Some(&hint)).await.unwrap_err();
        assert!(err.needs_reconnection());
    }
}
