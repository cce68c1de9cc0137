//! Token counting policies
//!
//! [`TokenCounter`] wraps a [`Tokenizer`] and applies the accounting rules
//! for prompts and results:
//! - tokenizer failures fall back to a character-ratio estimate, never an error
//! - every structured message pays a role and boundary overhead
//! - images are charged a fixed estimate
//! - tool/function call names, arguments and nested invocations are counted

use crate::message::{ContentPart, MessageContent, PromptMessage, PromptPayload};
use crate::tokenizer::{EstimateTokenizer, Tokenizer, DEFAULT_CHARS_PER_TOKEN};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Tokens charged per image part (one high-detail 1024x1024 image)
pub const IMAGE_TOKEN_ESTIMATE: usize = 765;

/// Tokens charged for a message's role marker
pub const ROLE_OVERHEAD: usize = 1;

/// Tokens charged per message boundary
pub const MESSAGE_BOUNDARY_OVERHEAD: usize = 3;

/// Token counter with fallback and prompt/result policies
#[derive(Clone)]
pub struct TokenCounter {
    tokenizer: Arc<dyn Tokenizer>,
    fallback: EstimateTokenizer,
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("tokenizer", &self.tokenizer.name())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl TokenCounter {
    /// Create a counter over `tokenizer` with the default fallback ratio
    #[must_use]
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            fallback: EstimateTokenizer::new(DEFAULT_CHARS_PER_TOKEN),
        }
    }

    /// Override the fallback characters-per-token ratio
    #[must_use]
    pub fn with_fallback_ratio(mut self, chars_per_token: f64) -> Self {
        self.fallback = EstimateTokenizer::new(chars_per_token);
        self
    }

    /// Name of the underlying tokenizer
    #[must_use]
    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    /// Count tokens in text; never fails
    pub async fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.tokenizer.count(text).await {
            Ok(count) => count,
            Err(e) => {
                let estimate = self.fallback.estimate(text);
                warn!(
                    tokenizer = self.tokenizer.name(),
                    error = %e,
                    estimate,
                    "tokenizer failed, using character estimate"
                );
                estimate
            }
        }
    }

    /// Count the input tokens of a full outbound payload
    pub async fn count_prompt(&self, payload: &PromptPayload) -> usize {
        match payload {
            PromptPayload::Text(text) => self.count_text(text).await,
            PromptPayload::Messages(messages) => {
                let mut total = 0;
                for message in messages {
                    total += self.count_message(message).await;
                }
                total
            }
        }
    }

    /// Count one structured message including overheads
    pub async fn count_message(&self, message: &PromptMessage) -> usize {
        let mut total = MESSAGE_BOUNDARY_OVERHEAD + ROLE_OVERHEAD;

        if let Some(name) = &message.name {
            total += self.count_text(name).await;
        }

        match &message.content {
            MessageContent::Text(text) => total += self.count_text(text).await,
            MessageContent::Parts(parts) => {
                for part in parts {
                    total += match part {
                        ContentPart::Text { text } => self.count_text(text).await,
                        ContentPart::ImageUrl { .. } => IMAGE_TOKEN_ESTIMATE,
                    };
                }
            }
        }

        if let Some(call) = &message.function_call {
            total += self.count_text(&call.name).await;
            total += self.count_text(&call.arguments).await;
        }

        for call in &message.tool_calls {
            total += self.count_text(&call.name).await;
            total += self.count_text(&call.arguments).await;
        }

        for invocation in &message.invocations {
            total += self.count_text(&invocation.name).await;
            total += self.count_text(&invocation.parameters).await;
            total += self.count_text(&invocation.result).await;
        }

        total
    }

    /// Count a generation result
    ///
    /// A host-supplied `precomputed` count already includes reasoning and is
    /// preferred; otherwise text and reasoning are tokenized separately.
    pub async fn count_output(
        &self,
        precomputed: Option<usize>,
        text: &str,
        reasoning: Option<&str>,
    ) -> usize {
        if let Some(count) = precomputed {
            return count;
        }
        let mut total = self.count_text(text).await;
        if let Some(reasoning) = reasoning {
            total += self.count_text(reasoning).await;
        }
        total
    }
}
