//! Tokenizer adapters
//!
//! A [`Tokenizer`] turns text into a token count. Counts may be exact
//! (tiktoken BPE) or approximate (character ratio); callers must not assume
//! parity with any provider's billing.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Characters per token used by the estimate tokenizer and as fallback
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Text to token-count adapter
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Human-readable tokenizer name
    fn name(&self) -> &str;

    /// Count the tokens in `text`
    async fn count(&self, text: &str) -> Result<usize>;
}

/// Supported tokenizer encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// OpenAI cl100k_base (GPT-4, GPT-3.5, close enough for most models)
    #[default]
    Cl100k,
    /// OpenAI o200k_base (GPT-4o family)
    O200k,
    /// Character-ratio estimate, no BPE tables
    Estimate,
}

impl TokenizerKind {
    /// Returns the configuration name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cl100k => "cl100k_base",
            Self::O200k => "o200k_base",
            Self::Estimate => "estimate",
        }
    }

    /// Build the tokenizer for this encoding
    pub fn build(self, chars_per_token: f64) -> Result<Arc<dyn Tokenizer>> {
        match self {
            Self::Cl100k | Self::O200k => Ok(Arc::new(TiktokenTokenizer::new(self)?)),
            Self::Estimate => Ok(Arc::new(EstimateTokenizer::new(chars_per_token))),
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cl100k_base" | "cl100k" => Ok(Self::Cl100k),
            "o200k_base" | "o200k" => Ok(Self::O200k),
            "estimate" | "none" => Ok(Self::Estimate),
            other => Err(Error::UnknownEncoding(other.to_string())),
        }
    }
}

/// BPE tokenizer backed by tiktoken
#[derive(Clone)]
pub struct TiktokenTokenizer {
    kind: TokenizerKind,
    bpe: Arc<CoreBPE>,
}

impl TiktokenTokenizer {
    /// Load the BPE tables for `kind`
    pub fn new(kind: TokenizerKind) -> Result<Self> {
        let bpe = match kind {
            TokenizerKind::Cl100k => tiktoken_rs::cl100k_base(),
            TokenizerKind::O200k => tiktoken_rs::o200k_base(),
            TokenizerKind::Estimate => {
                return Err(Error::Tokenizer(
                    "estimate is not a tiktoken encoding".to_string(),
                ))
            }
        }
        .map_err(|e| Error::Tokenizer(e.to_string()))?;

        Ok(Self {
            kind,
            bpe: Arc::new(bpe),
        })
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tokenizer for TiktokenTokenizer {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn count(&self, text: &str) -> Result<usize> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }
}

/// Approximate tokenizer: `ceil(chars / chars_per_token)`
#[derive(Debug, Clone, Copy)]
pub struct EstimateTokenizer {
    chars_per_token: f64,
}

impl EstimateTokenizer {
    /// Create with the given ratio; non-positive ratios use the default
    #[must_use]
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    /// Synchronous estimate, also used as the fallback path
    #[must_use]
    pub fn estimate(&self, text: &str) -> usize {
        let chars = text.chars().count();
        if chars == 0 {
            return 0;
        }
        (chars as f64 / self.chars_per_token).ceil() as usize
    }
}

impl Default for EstimateTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

#[async_trait]
impl Tokenizer for EstimateTokenizer {
    fn name(&self) -> &str {
        "estimate"
    }

    async fn count(&self, text: &str) -> Result<usize> {
        Ok(self.estimate(text))
    }
}
