//! Error types for tokentally-llm

use thiserror::Error;

/// LLM-side error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tokenizer could not be constructed or failed to encode
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Unknown tokenizer encoding name
    #[error("unknown tokenizer encoding: {0}")]
    UnknownEncoding(String),

    /// Tokenization task was cancelled or panicked
    #[error("tokenization task failed: {0}")]
    Task(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
