//! # rag-llm
//!
//! Language model clients used to synthesize answers from retrieved context.
//!
//! ## Features
//! - [`LanguageModel`] trait over a list of chat messages
//! - [`ApiLanguageModel`]: OpenAI-compatible and Anthropic endpoints with retries
//! - [`MockLanguageModel`]: deterministic echo model for tests and offline use

mod api;
mod mock;

pub use api::{ApiLanguageModel, ApiLanguageModelConfig};
pub use mock::MockLanguageModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for language model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No messages to complete")]
    EmptyPrompt,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Pluggable chat completion model.
///
/// Implementations must be thread-safe for concurrent use.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a conversation and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
