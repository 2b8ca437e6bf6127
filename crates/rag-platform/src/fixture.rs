//! Static in-memory platform.
//!
//! Serves fixed store data with per-type failure injection. Used by the
//! daemon's offline mode and throughout the test suites.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rag_types::DataType;

use crate::api::{Credential, PlatformApi, PlatformConnector};
use crate::error::PlatformError;
use crate::models::{Customer, Order, Product, StoreAnalytics, StoreProfile};

/// Failure a fixture can return for a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFailure {
    NotFound,
    Forbidden,
    Unauthorized,
    Timeout,
    ServerError,
}

impl FixtureFailure {
    fn to_error(self, what: &str) -> PlatformError {
        match self {
            FixtureFailure::NotFound => PlatformError::NotFound(what.to_string()),
            FixtureFailure::Forbidden => PlatformError::Forbidden(what.to_string()),
            FixtureFailure::Unauthorized => PlatformError::Unauthorized(what.to_string()),
            FixtureFailure::Timeout => PlatformError::Timeout,
            FixtureFailure::ServerError => PlatformError::Http(format!("500: {what}")),
        }
    }
}

/// In-memory [`PlatformApi`] with configurable data and failures.
#[derive(Default)]
pub struct FixturePlatform {
    store: StoreProfile,
    products: Vec<Product>,
    orders: Vec<Order>,
    customers: Vec<Customer>,
    analytics: StoreAnalytics,
    failures: HashMap<DataType, FixtureFailure>,
    connection_failure: Option<FixtureFailure>,
    latency: Option<Duration>,
    connection_calls: AtomicUsize,
}

impl FixturePlatform {
    pub fn new(store: StoreProfile) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    pub fn with_orders(mut self, orders: Vec<Order>) -> Self {
        self.orders = orders;
        self
    }

    pub fn with_customers(mut self, customers: Vec<Customer>) -> Self {
        self.customers = customers;
        self
    }

    pub fn with_analytics(mut self, analytics: StoreAnalytics) -> Self {
        self.analytics = analytics;
        self
    }

    /// Make every fetch of `data_type` fail.
    pub fn with_failure(mut self, data_type: DataType, failure: FixtureFailure) -> Self {
        self.failures.insert(data_type, failure);
        self
    }

    /// Make `test_connection` fail.
    pub fn with_connection_failure(mut self, failure: FixtureFailure) -> Self {
        self.connection_failure = Some(failure);
        self
    }

    /// Delay every call (lets tests overlap concurrent runs).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `test_connection` calls so far (one per ingestion run).
    pub fn connection_calls(&self) -> usize {
        self.connection_calls.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(&self, data_type: DataType, value: &T) -> Result<T, PlatformError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.get(&data_type) {
            Some(failure) => Err(failure.to_error(data_type.as_str())),
            None => Ok(value.clone()),
        }
    }
}

fn take<T: Clone>(items: &[T], limit: u32) -> Vec<T> {
    items.iter().take(limit as usize).cloned().collect()
}

#[async_trait]
impl PlatformApi for FixturePlatform {
    async fn test_connection(&self) -> Result<(), PlatformError> {
        self.connection_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.connection_failure {
            Some(failure) => Err(failure.to_error("connection")),
            None => Ok(()),
        }
    }

    async fn get_store(&self) -> Result<StoreProfile, PlatformError> {
        self.respond(DataType::Store, &self.store).await
    }

    async fn get_products(&self, limit: u32) -> Result<Vec<Product>, PlatformError> {
        self.respond(DataType::Products, &take(&self.products, limit)).await
    }

    async fn get_orders(&self, limit: u32) -> Result<Vec<Order>, PlatformError> {
        self.respond(DataType::Orders, &take(&self.orders, limit)).await
    }

    async fn get_customers(&self, limit: u32) -> Result<Vec<Customer>, PlatformError> {
        self.respond(DataType::Customers, &take(&self.customers, limit)).await
    }

    async fn get_store_analytics(&self) -> Result<StoreAnalytics, PlatformError> {
        self.respond(DataType::Analytics, &self.analytics).await
    }
}

/// Connector handing out fixture platforms per store.
///
/// When tokens are registered, unknown tokens are rejected as unauthorized.
#[derive(Default)]
pub struct FixtureConnector {
    platforms: HashMap<String, Arc<FixturePlatform>>,
    default_platform: Option<Arc<FixturePlatform>>,
    accepted_tokens: HashSet<String>,
}

impl FixtureConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `platform` for credentials whose platform id is `store_id`.
    pub fn with_store(mut self, store_id: impl Into<String>, platform: Arc<FixturePlatform>) -> Self {
        self.platforms.insert(store_id.into(), platform);
        self
    }

    /// Serve `platform` for any credential not matched by store.
    pub fn with_default(mut self, platform: Arc<FixturePlatform>) -> Self {
        self.default_platform = Some(platform);
        self
    }

    pub fn accept_token(mut self, token: impl Into<String>) -> Self {
        self.accepted_tokens.insert(token.into());
        self
    }
}

impl PlatformConnector for FixtureConnector {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn PlatformApi>, PlatformError> {
        if !self.accepted_tokens.is_empty() && !self.accepted_tokens.contains(credential.expose()) {
            return Err(PlatformError::Unauthorized("unknown token".to_string()));
        }

        let platform = credential
            .platform_id
            .as_ref()
            .and_then(|id| self.platforms.get(id))
            .or(self.default_platform.as_ref())
            .ok_or_else(|| PlatformError::NotFound("no fixture for credential".to_string()))?;

        Ok(platform.clone())
    }
}
