//! Built-in demo store served in `--offline` mode.

use rag_platform::{
    Customer, FixturePlatform, Order, OrderItem, Product, StoreAnalytics, StoreProfile,
    TenantRecord,
};

pub const DEMO_STORE_ID: &str = "demo";
pub const DEMO_USER_ID: &str = "demo-owner";
const DEMO_TOKEN: &str = "demo-token";

fn product(id: &str, name: &str, description: &str, price: f64, category: &str) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        description: Some(description.into()),
        price,
        currency: Some("SAR".into()),
        quantity: Some(20),
        status: Some("sale".into()),
        categories: vec![category.into()],
        ..Default::default()
    }
}

pub fn demo_platform() -> FixturePlatform {
    FixturePlatform::new(StoreProfile {
        id: DEMO_STORE_ID.into(),
        name: "Dune & Palm Coffee".into(),
        description: Some("Specialty coffee roaster shipping across the Gulf".into()),
        domain: Some("duneandpalm.example".into()),
        currency: Some("SAR".into()),
        ..Default::default()
    })
    .with_products(vec![
        product(
            "p-100",
            "Ethiopian Yirgacheffe Beans",
            "Light roast with jasmine and citrus notes, 250g",
            68.0,
            "Coffee",
        ),
        product(
            "p-101",
            "Cardamom House Blend",
            "Medium roast blended with green cardamom, 500g",
            95.0,
            "Coffee",
        ),
        product(
            "p-102",
            "Ceramic Pour-Over Dripper",
            "Handmade dripper fitting size 02 filters",
            120.0,
            "Equipment",
        ),
    ])
    .with_orders(vec![Order {
        id: "o-5001".into(),
        reference: Some("DP-5001".into()),
        status: "delivered".into(),
        total: 163.0,
        currency: Some("SAR".into()),
        customer_id: Some("c-1".into()),
        customer_name: Some("Layla Hassan".into()),
        items: vec![
            OrderItem {
                name: "Cardamom House Blend".into(),
                quantity: 1,
                ..Default::default()
            },
            OrderItem {
                name: "Ethiopian Yirgacheffe Beans".into(),
                quantity: 1,
                ..Default::default()
            },
        ],
        ..Default::default()
    }])
    .with_customers(vec![Customer {
        id: "c-1".into(),
        first_name: "Layla".into(),
        last_name: "Hassan".into(),
        city: Some("Riyadh".into()),
        orders_count: Some(1),
        ..Default::default()
    }])
    .with_analytics(StoreAnalytics {
        period: Some("last 30 days".into()),
        total_orders: 1,
        total_revenue: 163.0,
        total_customers: 1,
        total_products: 3,
        average_order_value: 163.0,
        top_products: vec!["Cardamom House Blend".into()],
    })
}

/// Active tenant record for the demo store.
pub fn demo_tenant() -> TenantRecord {
    TenantRecord::new(DEMO_STORE_ID, DEMO_USER_ID)
        .with_access_token(DEMO_TOKEN)
        .with_platform_id(DEMO_STORE_ID)
}
