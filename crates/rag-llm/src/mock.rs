//! Mock language model for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{ChatMessage, LanguageModel, LlmError, Role};

/// Deterministic model that echoes the final user message.
///
/// Useful for testing without making API calls. The reply contains the
/// prompt's context verbatim, so assertions can look for source text.
pub struct MockLanguageModel {
    /// Prefix for generated answers
    prefix: String,
    /// When set, every call fails with this message
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            prefix: "Based on the store data:".to_string(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create with custom answer prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Create a model whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(LlmError::Api(message.clone()));
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or(LlmError::EmptyPrompt)?;

        Ok(format!("{}\n{}", self.prefix, last_user.content))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_last_user_message() {
        let model = MockLanguageModel::with_prefix("Echo:");
        let reply = model
            .complete(&[
                ChatMessage::system("sys"),
                ChatMessage::user("first"),
                ChatMessage::assistant("ok"),
                ChatMessage::user("second"),
            ])
            .await
            .unwrap();
        assert_eq!(reply, "Echo:\nsecond");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_model_counts_calls() {
        let model = MockLanguageModel::failing("down");
        assert!(model.complete(&[ChatMessage::user("q")]).await.is_err());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_requires_user_message() {
        let model = MockLanguageModel::new();
        let err = model.complete(&[ChatMessage::system("only")]).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyPrompt));
    }
}
