//! Document processor: upstream records to embeddable chunks.
//!
//! Each record becomes a short human-readable summary. Identifiers stay in
//! metadata so answers can cite them. Records longer than the token budget
//! are split on word boundaries; the first part keeps the base id and later
//! parts get a `-part-{n}` suffix.

use std::sync::OnceLock;

use rag_platform::{Customer, Order, Product, StoreAnalytics, StoreProfile};
use rag_types::{ChunkMetadata, DataType, DocumentChunk};
use tiktoken_rs::CoreBPE;
use tracing::{debug, trace};

use crate::memory::ConversationTurn;

/// Source tag for chunks built from platform data.
pub const PLATFORM_SOURCE: &str = "platform";

/// Source tag for conversation turns.
pub const CONVERSATION_SOURCE: &str = "conversation";

static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn bpe() -> Option<&'static CoreBPE> {
    BPE.get_or_init(|| tiktoken_rs::cl100k_base().ok()).as_ref()
}

/// Count tokens with cl100k, falling back to ~4 chars per token.
pub fn count_tokens(text: &str) -> usize {
    match bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => (text.len() / 4).max(1),
    }
}

/// Turns platform records into [`DocumentChunk`]s.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    max_chunk_tokens: usize,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(512)
    }
}

impl DocumentProcessor {
    pub fn new(max_chunk_tokens: usize) -> Self {
        Self {
            max_chunk_tokens: max_chunk_tokens.max(16),
        }
    }

    pub fn max_chunk_tokens(&self) -> usize {
        self.max_chunk_tokens
    }

    pub fn process_store(&self, store_id: &str, store: &StoreProfile) -> Vec<DocumentChunk> {
        let mut lines = vec![format!("Store: {}", store.name)];
        push_opt(&mut lines, "Description", store.description.as_deref().map(clean_text));
        push_opt(&mut lines, "Website", store.domain.clone());
        push_opt(&mut lines, "Contact email", store.email.clone());
        push_opt(&mut lines, "Currency", store.currency.clone());
        push_opt(&mut lines, "Plan", store.plan.clone());

        let metadata = ChunkMetadata::new(DataType::Store, store_id, PLATFORM_SOURCE)
            .with_field("store_name", store.name.clone())
            .with_field("platform_store_id", store.id.clone());
        self.split(format!("store-{store_id}"), lines.join("\n"), metadata)
    }

    pub fn process_products(&self, store_id: &str, products: &[Product]) -> Vec<DocumentChunk> {
        products
            .iter()
            .flat_map(|p| self.process_product(store_id, p))
            .collect()
    }

    fn process_product(&self, store_id: &str, product: &Product) -> Vec<DocumentChunk> {
        let currency = product.currency.as_deref().unwrap_or("");
        let mut lines = vec![
            format!("Product: {}", product.name),
            format!("Price: {:.2} {}", product.price, currency).trim_end().to_string(),
        ];
        push_opt(&mut lines, "SKU", product.sku.clone());
        push_opt(&mut lines, "In stock", product.quantity.map(|q| q.to_string()));
        push_opt(&mut lines, "Status", product.status.clone());
        if !product.categories.is_empty() {
            lines.push(format!("Categories: {}", product.categories.join(", ")));
        }
        push_opt(&mut lines, "Description", product.description.as_deref().map(clean_text));

        let mut metadata = ChunkMetadata::new(DataType::Products, store_id, PLATFORM_SOURCE)
            .with_field("product_id", product.id.clone())
            .with_field("name", product.name.clone())
            .with_field("price", product.price);
        if let Some(category) = product.categories.first() {
            metadata = metadata.with_field("category", category.clone());
        }
        self.split(format!("product-{}", product.id), lines.join("\n"), metadata)
    }

    pub fn process_orders(&self, store_id: &str, orders: &[Order]) -> Vec<DocumentChunk> {
        orders
            .iter()
            .flat_map(|o| self.process_order(store_id, o))
            .collect()
    }

    fn process_order(&self, store_id: &str, order: &Order) -> Vec<DocumentChunk> {
        let reference = order.reference.as_deref().unwrap_or(&order.id);
        let currency = order.currency.as_deref().unwrap_or("");
        let mut lines = vec![
            format!("Order {reference}"),
            format!("Status: {}", order.status),
            format!("Total: {:.2} {}", order.total, currency).trim_end().to_string(),
        ];
        push_opt(&mut lines, "Customer", order.customer_name.clone());
        if !order.items.is_empty() {
            let items: Vec<String> = order
                .items
                .iter()
                .map(|i| format!("{}x {}", i.quantity, i.name))
                .collect();
            lines.push(format!("Items: {}", items.join(", ")));
        }
        push_opt(&mut lines, "Placed", order.created_at.clone());

        let mut metadata = ChunkMetadata::new(DataType::Orders, store_id, PLATFORM_SOURCE)
            .with_field("order_id", order.id.clone())
            .with_field("status", order.status.clone())
            .with_field("total", order.total);
        if let Some(customer_id) = &order.customer_id {
            metadata = metadata.with_field("customer_id", customer_id.clone());
        }
        self.split(format!("order-{}", order.id), lines.join("\n"), metadata)
    }

    pub fn process_customers(&self, store_id: &str, customers: &[Customer]) -> Vec<DocumentChunk> {
        customers
            .iter()
            .flat_map(|c| self.process_customer(store_id, c))
            .collect()
    }

    fn process_customer(&self, store_id: &str, customer: &Customer) -> Vec<DocumentChunk> {
        let mut lines = vec![format!("Customer: {}", customer.full_name())];
        push_opt(&mut lines, "Email", customer.email.clone());
        push_opt(&mut lines, "Phone", customer.mobile.clone());
        let location: Vec<&str> = [customer.city.as_deref(), customer.country.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !location.is_empty() {
            lines.push(format!("Location: {}", location.join(", ")));
        }
        push_opt(&mut lines, "Orders placed", customer.orders_count.map(|n| n.to_string()));

        let metadata = ChunkMetadata::new(DataType::Customers, store_id, PLATFORM_SOURCE)
            .with_field("customer_id", customer.id.clone())
            .with_field("name", customer.full_name());
        self.split(format!("customer-{}", customer.id), lines.join("\n"), metadata)
    }

    pub fn process_analytics(&self, store_id: &str, analytics: &StoreAnalytics) -> Vec<DocumentChunk> {
        let period = analytics.period.as_deref().unwrap_or("all time");
        let mut lines = vec![
            format!("Store analytics ({period})"),
            format!("Total orders: {}", analytics.total_orders),
            format!("Total revenue: {:.2}", analytics.total_revenue),
            format!("Total customers: {}", analytics.total_customers),
            format!("Total products: {}", analytics.total_products),
            format!("Average order value: {:.2}", analytics.average_order_value),
        ];
        if !analytics.top_products.is_empty() {
            lines.push(format!("Top products: {}", analytics.top_products.join(", ")));
        }

        let metadata = ChunkMetadata::new(DataType::Analytics, store_id, PLATFORM_SOURCE)
            .with_field("period", period)
            .with_field("total_orders", analytics.total_orders);
        self.split(format!("analytics-{store_id}"), lines.join("\n"), metadata)
    }

    /// One question/answer exchange of an agent conversation, keyed by the
    /// turn's id.
    pub fn process_conversation_turn(
        &self,
        store_id: &str,
        conversation_id: &str,
        turn: &ConversationTurn,
    ) -> Vec<DocumentChunk> {
        let content = format!(
            "Customer: {}\nAssistant: {}",
            clean_text(&turn.user),
            clean_text(&turn.assistant)
        );
        let metadata = ChunkMetadata::new(DataType::Conversations, store_id, CONVERSATION_SOURCE)
            .with_field("conversation_id", conversation_id)
            .with_field("turn", turn.turn)
            .with_field("turn_id", turn.id.as_str());
        self.split(
            format!("conversation-{conversation_id}-{}", turn.id),
            content,
            metadata,
        )
    }

    /// Split `content` into chunks of at most `max_chunk_tokens`.
    fn split(&self, base_id: String, content: String, metadata: ChunkMetadata) -> Vec<DocumentChunk> {
        if count_tokens(&content) <= self.max_chunk_tokens {
            return vec![DocumentChunk::new(base_id, content, metadata)];
        }

        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;
        for word in content.split_inclusive(char::is_whitespace) {
            let word_tokens = count_tokens(word);
            if current_tokens + word_tokens > self.max_chunk_tokens && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            current.push_str(word);
            current_tokens += word_tokens;
        }
        if !current.trim().is_empty() {
            parts.push(current);
        }

        let total = parts.len();
        debug!(id = %base_id, parts = total, "Split oversized record");
        parts
            .into_iter()
            .enumerate()
            .map(|(n, text)| {
                let id = if n == 0 {
                    base_id.clone()
                } else {
                    format!("{base_id}-part-{n}")
                };
                trace!(id = %id, "Chunk part");
                let meta = metadata
                    .clone()
                    .with_field("part", n)
                    .with_field("total_parts", total);
                DocumentChunk::new(id, text.trim().to_string(), meta)
            })
            .collect()
    }
}

fn push_opt(lines: &mut Vec<String>, label: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        lines.push(format!("{label}: {value}"));
    }
}

/// Strip markup tags and collapse whitespace.
fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
