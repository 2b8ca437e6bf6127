//! Retrieval: role-aware multi-namespace search and answer synthesis.
//!
//! The query is embedded once and fanned out to the role's namespaces.
//! Each namespace contributes `ceil(top_k / n)` candidates, filtered by the
//! minimum score before the pool is merged by score and truncated. Search
//! never fails: any error becomes a low-confidence apology.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use futures::future::try_join_all;
use rag_llm::ChatMessage;
use rag_types::{DataType, NamespaceKey};
use rag_vector::ScoredChunk;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::RagEngine;
use crate::error::RagError;

/// Floor and ceiling of reported confidence.
pub const MIN_CONFIDENCE: f32 = 0.1;
pub const MAX_CONFIDENCE: f32 = 0.95;

/// Returned when nothing relevant survived filtering.
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have information about that in this store's data yet.";

/// Returned when retrieval or synthesis failed.
pub const APOLOGY_ANSWER: &str =
    "I'm sorry, I couldn't look that up right now. Please try again in a moment.";

/// Which downstream agent is asking; decides the namespaces searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Product,
    CustomerService,
    Sales,
    Orders,
    Analytics,
    #[default]
    General,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Product,
        AgentRole::CustomerService,
        AgentRole::Sales,
        AgentRole::Orders,
        AgentRole::Analytics,
        AgentRole::General,
    ];

    /// Namespaces searched for this role, most relevant first.
    pub fn data_types(&self) -> &'static [DataType] {
        use DataType::*;
        match self {
            AgentRole::Product => &[Products, Store, Analytics],
            AgentRole::CustomerService => &[Customers, Orders, Conversations, Products],
            AgentRole::Sales => &[Products, Customers, Orders, Analytics],
            AgentRole::Orders => &[Orders, Customers, Products],
            AgentRole::Analytics => &[Analytics, Orders, Products, Store],
            AgentRole::General => &[Store, Products, Orders, Customers, Analytics],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Product => "product",
            AgentRole::CustomerService => "customer-service",
            AgentRole::Sales => "sales",
            AgentRole::Orders => "orders",
            AgentRole::Analytics => "analytics",
            AgentRole::General => "general",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            AgentRole::Product => {
                "You are a product specialist for an online store. Recommend and describe \
                 products, quoting names and prices exactly as given."
            }
            AgentRole::CustomerService => {
                "You are a customer service agent for an online store. Be warm and concise, \
                 and refer to order and customer details only as they appear in the context."
            }
            AgentRole::Sales => {
                "You are a sales assistant for an online store. Suggest relevant products and \
                 offers that fit the customer's history."
            }
            AgentRole::Orders => {
                "You are an order tracking assistant. Report order status, totals and items \
                 exactly as recorded."
            }
            AgentRole::Analytics => {
                "You are a business analyst for a store owner. Summarize the numbers in the \
                 context and point out notable trends."
            }
            AgentRole::General => {
                "You are a helpful assistant for an online store. Answer questions about the \
                 store, its products, orders and customers."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| format!("unknown agent role: {s}"))
    }
}

/// Who is searching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub store_id: String,
    pub agent_role: AgentRole,
    /// Feeds recent turns of this conversation into the prompt
    pub conversation_id: Option<String>,
}

impl SearchContext {
    pub fn new(store_id: impl Into<String>, agent_role: AgentRole) -> Self {
        Self {
            store_id: store_id.into(),
            agent_role,
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Per-call overrides of the retrieval settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub top_k: Option<usize>,
    pub min_score: Option<f32>,
    /// Replaces the role's namespace list
    pub data_types: Option<Vec<DataType>>,
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_data_types(mut self, data_types: Vec<DataType>) -> Self {
        self.data_types = Some(data_types);
        self
    }
}

/// A chunk cited by an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub data_type: DataType,
    pub score: f32,
    pub content: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl From<ScoredChunk> for SourceDocument {
    fn from(hit: ScoredChunk) -> Self {
        Self {
            id: hit.chunk.id,
            data_type: hit.chunk.metadata.data_type,
            score: hit.score,
            content: hit.chunk.content,
            fields: hit.chunk.metadata.fields,
        }
    }
}

/// How an answer was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerMetadata {
    pub agent_role: AgentRole,
    /// Namespaces queried, in role order
    pub namespaces: Vec<String>,
    /// Candidates returned before filtering
    pub candidates: usize,
    /// Model that wrote the answer, if one was called
    pub model: Option<String>,
    /// Set when the answer is the apology fallback
    pub error: Option<String>,
}

/// Structured answer handed to the agent layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub metadata: AnswerMetadata,
}

impl RagAnswer {
    fn low_confidence(answer: &str, metadata: AnswerMetadata) -> Self {
        Self {
            answer: answer.to_string(),
            sources: Vec::new(),
            confidence: MIN_CONFIDENCE,
            processing_time_ms: 0,
            metadata,
        }
    }

    /// True when the answer came from the apology path.
    pub fn is_fallback(&self) -> bool {
        self.metadata.error.is_some()
    }
}

/// Mean score scaled and clamped to `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
pub fn confidence(hits: &[ScoredChunk], scale: f32) -> f32 {
    if hits.is_empty() {
        return MIN_CONFIDENCE;
    }
    let mean = hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32;
    (mean * scale).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

impl RagEngine {
    /// Answer a query from the tenant's namespaces. Never fails.
    pub async fn search(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> RagAnswer {
        let start = Instant::now();
        let mut answer = match self.try_search(query, context, options).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(
                    store_id = %context.store_id,
                    agent_role = %context.agent_role,
                    error = %e,
                    "Search failed, answering with apology"
                );
                RagAnswer::low_confidence(
                    APOLOGY_ANSWER,
                    AnswerMetadata {
                        agent_role: context.agent_role,
                        error: Some(e.to_string()),
                        ..Default::default()
                    },
                )
            }
        };
        answer.processing_time_ms = start.elapsed().as_millis() as u64;
        answer
    }

    async fn try_search(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> Result<RagAnswer, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery("query is empty".to_string()));
        }

        let requested = options
            .data_types
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| context.agent_role.data_types().to_vec());
        let mut types: Vec<DataType> = Vec::with_capacity(requested.len());
        for data_type in requested {
            if !types.contains(&data_type) {
                types.push(data_type);
            }
        }
        let top_k = options.top_k.unwrap_or(self.retrieval.top_k).max(1);
        let min_score = options.min_score.unwrap_or(self.retrieval.min_score);
        let per_namespace = top_k.div_ceil(types.len());

        let keys: Vec<NamespaceKey> = types
            .iter()
            .map(|t| NamespaceKey::new(context.store_id.as_str(), *t))
            .collect();
        let embedding = self.store.embed_query(query).await?;

        let searches = keys.iter().map(|key| {
            let client = self.store.namespace(key);
            let embedding = &embedding;
            async move {
                client
                    .similarity_search_by_embedding(embedding, per_namespace)
                    .await
            }
        });
        let results = try_join_all(searches).await?;

        let mut candidates = 0;
        let mut pooled: Vec<ScoredChunk> = Vec::new();
        for (key, hits) in keys.iter().zip(results) {
            candidates += hits.len();
            let kept: Vec<ScoredChunk> = hits
                .into_iter()
                .filter(|h| !h.chunk.is_placeholder() && h.score >= min_score)
                .collect();
            debug!(namespace = %key, kept = kept.len(), "Namespace results");
            pooled.extend(kept);
        }

        pooled.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        pooled.truncate(top_k);

        let mut metadata = AnswerMetadata {
            agent_role: context.agent_role,
            namespaces: keys.iter().map(|k| k.to_string()).collect(),
            candidates,
            model: None,
            error: None,
        };

        if pooled.is_empty() {
            info!(store_id = %context.store_id, candidates, "No relevant documents");
            return Ok(RagAnswer::low_confidence(NO_INFORMATION_ANSWER, metadata));
        }

        let messages = self.build_prompt(query, context, &pooled);
        let answer = self.llm.complete(&messages).await?;
        metadata.model = Some(self.llm.model_name().to_string());

        let confidence = confidence(&pooled, self.retrieval.confidence_scale);
        info!(
            store_id = %context.store_id,
            agent_role = %context.agent_role,
            sources = pooled.len(),
            confidence,
            "Answered query"
        );

        Ok(RagAnswer {
            answer,
            sources: pooled.into_iter().map(SourceDocument::from).collect(),
            confidence,
            processing_time_ms: 0,
            metadata,
        })
    }

    fn build_prompt(
        &self,
        query: &str,
        context: &SearchContext,
        hits: &[ScoredChunk],
    ) -> Vec<ChatMessage> {
        let system = format!(
            "{}\nAnswer only from the store context provided. If the context does not \
             contain the answer, say that you don't know.",
            context.agent_role.instructions()
        );
        let mut messages = vec![ChatMessage::system(system)];

        if let Some(conversation_id) = &context.conversation_id {
            for turn in self.memory.history(&context.store_id, conversation_id) {
                messages.push(ChatMessage::user(turn.user));
                messages.push(ChatMessage::assistant(turn.assistant));
            }
        }

        let context_block: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, h)| format!("[{}] ({}) {}", i + 1, h.chunk.metadata.data_type, h.chunk.content))
            .collect();
        messages.push(ChatMessage::user(format!(
            "Store context:\n{}\n\nQuestion: {}",
            context_block.join("\n\n"),
            query
        )));
        messages
    }
}
