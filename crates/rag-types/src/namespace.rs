//! Tenant namespace partitioning.
//!
//! Every tenant owns six logical namespaces, one per [`DataType`]. The key
//! format is a stable convention shared with the vector database:
//! `tenant-{store_id}` for the store profile and `tenant-{store_id}-{type}`
//! for everything else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Kind of knowledge held in a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Store profile (name, description, contact details)
    Store,
    /// Product catalogue
    Products,
    /// Order history
    Orders,
    /// Customer records
    Customers,
    /// Analytics snapshot
    Analytics,
    /// Conversation turns recorded by the agent layer
    Conversations,
}

impl DataType {
    /// All data types in bootstrap order.
    pub const ALL: [DataType; 6] = [
        DataType::Store,
        DataType::Products,
        DataType::Orders,
        DataType::Customers,
        DataType::Analytics,
        DataType::Conversations,
    ];

    /// Data types pulled from the upstream platform during ingestion.
    pub const UPSTREAM: [DataType; 5] = [
        DataType::Store,
        DataType::Products,
        DataType::Orders,
        DataType::Customers,
        DataType::Analytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Store => "store",
            DataType::Products => "products",
            DataType::Orders => "orders",
            DataType::Customers => "customers",
            DataType::Analytics => "analytics",
            DataType::Conversations => "conversations",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "store" => Ok(DataType::Store),
            "products" | "product" => Ok(DataType::Products),
            "orders" | "order" => Ok(DataType::Orders),
            "customers" | "customer" => Ok(DataType::Customers),
            "analytics" => Ok(DataType::Analytics),
            "conversations" | "conversation" => Ok(DataType::Conversations),
            other => Err(TypesError::UnknownDataType(other.to_string())),
        }
    }
}

/// Logical namespace key for one `(store_id, data_type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceKey {
    pub store_id: String,
    pub data_type: DataType,
}

impl NamespaceKey {
    pub fn new(store_id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            store_id: store_id.into(),
            data_type,
        }
    }

    /// All six namespace keys owned by a tenant.
    pub fn all_for(store_id: &str) -> Vec<NamespaceKey> {
        DataType::ALL
            .iter()
            .map(|dt| NamespaceKey::new(store_id, *dt))
            .collect()
    }

    /// Deterministic id of the placeholder document for this namespace.
    pub fn placeholder_id(&self) -> String {
        format!("placeholder-{}-{}", self.store_id, self.data_type)
    }

    /// Parse a namespace name back into a key.
    ///
    /// Store ids may contain dashes, so the data type is matched as a suffix.
    pub fn parse(name: &str) -> Result<Self, TypesError> {
        let rest = name
            .strip_prefix("tenant-")
            .ok_or_else(|| TypesError::InvalidInput(format!("not a tenant namespace: {name}")))?;

        for data_type in DataType::ALL {
            if data_type == DataType::Store {
                continue;
            }
            let suffix = format!("-{}", data_type);
            if let Some(store_id) = rest.strip_suffix(&suffix) {
                if !store_id.is_empty() {
                    return Ok(NamespaceKey::new(store_id, data_type));
                }
            }
        }

        if rest.is_empty() {
            return Err(TypesError::InvalidInput(format!("missing store id: {name}")));
        }
        Ok(NamespaceKey::new(rest, DataType::Store))
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_type {
            DataType::Store => write!(f, "tenant-{}", self.store_id),
            other => write!(f, "tenant-{}-{}", self.store_id, other),
        }
    }
}
