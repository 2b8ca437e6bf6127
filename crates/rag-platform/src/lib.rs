//! # rag-platform
//!
//! Collaborators the RAG subsystem consumes from the surrounding product:
//! the upstream e-commerce platform API, the credential resolver, and the
//! tenant record store.
//!
//! ## Features
//! - [`PlatformApi`] / [`PlatformConnector`]: read-only store data access
//! - [`HttpPlatformClient`]: bearer-token REST client
//! - [`FixturePlatform`]: static in-memory data with injectable failures
//! - [`TenantDirectory`] / [`InMemoryTenantDirectory`]: tenant records
//! - [`CredentialResolver`] / [`DirectoryCredentialResolver`]

pub mod api;
pub mod credentials;
pub mod error;
pub mod fixture;
pub mod http;
pub mod models;
pub mod tenants;

pub use api::{Credential, PlatformApi, PlatformConnector};
pub use credentials::{CredentialResolver, DirectoryCredentialResolver};
pub use error::PlatformError;
pub use fixture::{FixtureConnector, FixtureFailure, FixturePlatform};
pub use http::{HttpConnector, HttpPlatformClient};
pub use models::{Customer, Order, OrderItem, Product, StoreAnalytics, StoreProfile};
pub use tenants::{InMemoryTenantDirectory, TenantDirectory, TenantRecord};
