//! Bearer-token REST client for the upstream platform.
//!
//! Responses use the `{"status": .., "success": .., "data": ..}` envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::api::{Credential, PlatformApi, PlatformConnector};
use crate::error::PlatformError;
use crate::models::{Customer, Order, Product, StoreAnalytics, StoreProfile};

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// REST client bound to one store credential.
pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
    credential: Credential,
}

impl HttpPlatformClient {
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Platform request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.credential.expose())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => PlatformError::NotFound(path.to_string()),
                StatusCode::FORBIDDEN => PlatformError::Forbidden(path.to_string()),
                StatusCode::UNAUTHORIZED => PlatformError::Unauthorized(body),
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PlatformError::Timeout,
                other => PlatformError::Http(format!("{}: {}", other, body)),
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn test_connection(&self) -> Result<(), PlatformError> {
        self.get::<serde_json::Value>("/store/info", &[]).await.map(|_| ())
    }

    async fn get_store(&self) -> Result<StoreProfile, PlatformError> {
        self.get("/store/info", &[]).await
    }

    async fn get_products(&self, limit: u32) -> Result<Vec<Product>, PlatformError> {
        self.get("/products", &[("per_page", limit.to_string())]).await
    }

    async fn get_orders(&self, limit: u32) -> Result<Vec<Order>, PlatformError> {
        self.get("/orders", &[("per_page", limit.to_string())]).await
    }

    async fn get_customers(&self, limit: u32) -> Result<Vec<Customer>, PlatformError> {
        self.get("/customers", &[("per_page", limit.to_string())]).await
    }

    async fn get_store_analytics(&self) -> Result<StoreAnalytics, PlatformError> {
        self.get("/analytics/summary", &[]).await
    }
}

/// Connector producing [`HttpPlatformClient`]s against one base URL.
pub struct HttpConnector {
    base_url: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl PlatformConnector for HttpConnector {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn PlatformApi>, PlatformError> {
        let client = HttpPlatformClient::new(self.base_url.clone(), credential.clone(), self.timeout)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpPlatformClient {
        HttpPlatformClient::new(server.uri(), Credential::new("tok"), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_products_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("per_page", "50"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "success": true,
                "data": [
                    {"id": "1", "name": "Blue Shirt", "price": 19.5},
                    {"id": "2", "name": "Leather Wallet", "price": 40.0}
                ]
            })))
            .mount(&server)
            .await;

        let products = client(&server).get_products(50).await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].name, "Leather Wallet");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/orders"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/analytics/summary"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(path("/store/info"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let client = client(&server);
        let orders = client.get_orders(10).await.unwrap_err();
        assert!(matches!(orders, PlatformError::NotFound(_)));
        assert!(orders.is_feature_unavailable());

        let analytics = client.get_store_analytics().await.unwrap_err();
        assert!(matches!(analytics, PlatformError::Forbidden(_)));

        let conn = client.test_connection().await.unwrap_err();
        assert!(matches!(conn, PlatformError::Unauthorized(_)));
        assert!(!conn.is_feature_unavailable());
    }
}
