//! Upstream record shapes.
//!
//! Only the fields the indexer turns into text are modelled; unknown fields
//! are ignored on decode.

use serde::{Deserialize, Serialize};

/// Store profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub orders_count: Option<u32>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Aggregate store metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreAnalytics {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub average_order_value: f64,
    #[serde(default)]
    pub top_products: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "7",
            "name": "Blue Shirt",
            "price": 19.5,
            "promotion": {"title": "ignored"}
        }))
        .unwrap();
        assert_eq!(product.name, "Blue Shirt");
        assert!(product.categories.is_empty());
    }

    #[test]
    fn test_customer_full_name() {
        let customer = Customer {
            id: "1".into(),
            first_name: "Sara".into(),
            ..Default::default()
        };
        assert_eq!(customer.full_name(), "Sara");
    }
}
