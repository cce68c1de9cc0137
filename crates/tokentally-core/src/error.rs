//! Error types for tokentally-core
//!
//! This module provides error types and user-friendly error formatting.
//! Accounting paths (recording, lifecycle handlers, interception) never
//! surface these; they log and continue.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Settings blob could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON encoding/decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Import document lacks the required structure
    #[error("invalid import: {0}")]
    InvalidImport(String),

    /// Range bound is not a `YYYY-MM-DD` day key
    #[error("invalid day key: {0}")]
    InvalidDayKey(String),

    /// Tokenizer error
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] tokentally_llm::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Storage(msg) => format!("Could not access usage data: {}", msg),
            Error::Serialization(e) => format!("Usage data is not valid JSON: {}", e),
            Error::InvalidImport(msg) => format!("Import rejected: {}", msg),
            Error::InvalidDayKey(key) => format!("'{}' is not a valid day", key),
            Error::Tokenizer(e) => format!("Tokenizer problem: {}", e),
            Error::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Storage(_) => {
                Some("Check that the data directory exists and is writable.".to_string())
            }
            Error::InvalidImport(_) => Some(
                "Import files must be JSON documents produced by `tokentally export`.".to_string(),
            ),
            Error::InvalidDayKey(_) => Some("Use the YYYY-MM-DD format, e.g. 2026-03-01.".to_string()),
            Error::Tokenizer(_) => Some(
                "Set TOKENTALLY_TOKENIZER__ENCODING to cl100k_base, o200k_base or estimate."
                    .to_string(),
            ),
            Error::Serialization(_) | Error::Internal(_) => None,
        }
    }
}

/// Format an error for CLI output
#[must_use]
pub fn format_error_for_cli(error: &Error) -> String {
    match error.suggestion() {
        Some(suggestion) => format!("{}\n  {}", error.user_message(), suggestion),
        None => error.user_message(),
    }
}
