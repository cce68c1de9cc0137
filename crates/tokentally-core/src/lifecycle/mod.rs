//! Generation Lifecycle Tracker
//!
//! Correlates the host's generation events into exactly one recording per
//! real generation attempt.
//!
//! # Module Structure
//!
//! - `tracker`: the `Idle | Awaiting` state machine and its event handlers
//!
//! The host-facing types (events, chat access) live here so adapters can
//! depend on them without pulling in the tracker.

mod tracker;

#[cfg(test)]
mod tests;

pub use tracker::LifecycleTracker;

use serde::{Deserialize, Serialize};
use tokentally_llm::PromptPayload;

/// Kind of generation the host started
///
/// Unknown kinds decode as [`GenerationKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenerationKind {
    /// A fresh reply
    #[default]
    Normal,
    /// Extends the last message in place
    Continue,
    /// Alternative reply for the last message
    Swipe,
    /// Replaces the last reply
    Regenerate,
    /// Background completion with no result notification
    Quiet,
    /// Writes the user's next message
    Impersonate,
    /// Any kind this crate does not distinguish
    Other,
}

impl GenerationKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Continue => "continue",
            Self::Swipe => "swipe",
            Self::Regenerate => "regenerate",
            Self::Quiet => "quiet",
            Self::Impersonate => "impersonate",
            Self::Other => "other",
        }
    }
}

impl From<String> for GenerationKind {
    fn from(kind: String) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "continue" => Self::Continue,
            "swipe" => Self::Swipe,
            "regenerate" => Self::Regenerate,
            "quiet" => Self::Quiet,
            "impersonate" => Self::Impersonate,
            _ => Self::Other,
        }
    }
}

impl From<GenerationKind> for String {
    fn from(kind: GenerationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Where a received message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Produced by a model call
    #[default]
    Generation,
    /// Injected by a slash command
    SlashCommand,
    /// A chat's greeting template
    FirstMessage,
    /// Inserted by another extension
    Extension,
}

impl MessageSource {
    /// Whether the message corresponds to a real model call
    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generation)
    }
}

/// A message in the host's chat log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message body
    pub text: String,
    /// Attached reasoning/thinking text
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Host-computed token count (includes reasoning)
    #[serde(default)]
    pub token_count: Option<usize>,
}

impl ChatMessage {
    /// Message with only a body
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Read access to the host's current chat
pub trait ChatContext: Send + Sync {
    /// Current chat id, if a chat is open
    fn chat_id(&self) -> Option<String>;

    /// Model currently selected
    fn current_model(&self) -> Option<String>;

    /// Message at `index`
    fn message(&self, index: usize) -> Option<ChatMessage>;

    /// Most recent message
    fn last_message(&self) -> Option<ChatMessage>;

    /// Text streamed so far for the in-flight generation
    fn streaming_text(&self) -> Option<String>;
}

/// Context with no chat open
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChat;

impl ChatContext for NoChat {
    fn chat_id(&self) -> Option<String> {
        None
    }

    fn current_model(&self) -> Option<String> {
        None
    }

    fn message(&self, _index: usize) -> Option<ChatMessage> {
        None
    }

    fn last_message(&self) -> Option<ChatMessage> {
        None
    }

    fn streaming_text(&self) -> Option<String> {
        None
    }
}

/// Host notifications the tracker consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A generation is about to start
    GenerationStarted {
        /// Generation kind
        kind: GenerationKind,
        /// Estimation only, no real request
        #[serde(default)]
        dry_run: bool,
    },
    /// The outbound prompt is assembled
    RequestReady {
        /// Full prompt
        payload: PromptPayload,
        /// Estimation only, no real request
        #[serde(default)]
        dry_run: bool,
    },
    /// A message landed in the chat log
    MessageReceived {
        /// Index into the chat log
        index: usize,
        /// Origin of the message
        #[serde(default)]
        source: MessageSource,
    },
    /// The user stopped the generation
    GenerationStopped,
    /// Impersonation text is ready
    ImpersonationReady {
        /// Generated text
        text: String,
    },
    /// The host switched conversations
    ChatChanged {
        /// New chat id
        chat_id: Option<String>,
    },
}
