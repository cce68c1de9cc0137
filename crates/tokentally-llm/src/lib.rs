//! Tokentally LLM - Tokenizer and pricing primitives
//!
//! This crate provides the model-facing pieces of Tokentally:
//! - Tokenizer: adapter trait plus tiktoken and character-ratio implementations
//! - Token: prompt and result counting policies on top of a tokenizer
//! - Message: outbound prompt payloads (raw text or structured messages)
//! - Pricing: per-model prices and cost calculation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod message;
pub mod pricing;
pub mod token;
pub mod tokenizer;

pub use error::{Error, Result};
pub use message::{
    ContentPart, FunctionCall, MessageContent, MessageRole, PromptMessage, PromptPayload,
    ToolCall, ToolInvocation,
};
pub use pricing::{suggested_price, ModelPrice};
pub use token::{
    TokenCounter, IMAGE_TOKEN_ESTIMATE, MESSAGE_BOUNDARY_OVERHEAD, ROLE_OVERHEAD,
};
pub use tokenizer::{
    EstimateTokenizer, TiktokenTokenizer, Tokenizer, TokenizerKind, DEFAULT_CHARS_PER_TOKEN,
};
