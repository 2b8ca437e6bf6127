//! Upstream platform traits.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::PlatformError;
use crate::models::{Customer, Order, Product, StoreAnalytics, StoreProfile};

/// Access credential for one store.
pub struct Credential {
    pub token: SecretString,
    /// Platform-side merchant id, when known
    pub platform_id: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            platform_id: None,
        }
    }

    pub fn with_platform_id(mut self, platform_id: Option<String>) -> Self {
        self.platform_id = platform_id;
        self
    }

    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self {
            token: SecretString::from(self.token.expose_secret().to_owned()),
            platform_id: self.platform_id.clone(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("platform_id", &self.platform_id)
            .finish()
    }
}

/// Read-only view of one store on the upstream platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Cheap authenticated call proving the credential works.
    async fn test_connection(&self) -> Result<(), PlatformError>;

    async fn get_store(&self) -> Result<StoreProfile, PlatformError>;

    async fn get_products(&self, limit: u32) -> Result<Vec<Product>, PlatformError>;

    async fn get_orders(&self, limit: u32) -> Result<Vec<Order>, PlatformError>;

    async fn get_customers(&self, limit: u32) -> Result<Vec<Customer>, PlatformError>;

    async fn get_store_analytics(&self) -> Result<StoreAnalytics, PlatformError>;
}

/// Builds a [`PlatformApi`] bound to a credential.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn PlatformApi>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret").with_platform_id(Some("m-1".into()));
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("m-1"));
        assert_eq!(credential.clone().expose(), "super-secret");
    }
}
