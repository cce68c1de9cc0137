//! EventBus - broadcast-based "usage updated" notifications.
//!
//! Published after every recording, reset, import and chat change so the
//! query and presentation layers can refresh. Dropping a receiver
//! unsubscribes it.

use crate::budget::BudgetWarning;
use crate::transfer::ImportMode;
use serde::Serialize;
use tokio::sync::broadcast;

/// Notifications emitted by the accounting engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageEvent {
    /// A recording was applied to every bucket
    Recorded {
        /// Input tokens recorded
        input: u64,
        /// Output tokens recorded
        output: u64,
        /// Chat the recording was attributed to
        chat_id: Option<String>,
        /// Model the recording was attributed to
        model_id: Option<String>,
        /// Day key the recording landed in
        day: String,
    },
    /// All usage was cleared
    Reset,
    /// Usage data was imported
    Imported {
        /// Merge or replace
        mode: ImportMode,
    },
    /// The host switched conversations
    ChatChanged {
        /// New chat id
        chat_id: Option<String>,
    },
    /// A budget threshold was crossed
    BudgetWarning {
        /// Warning details
        warning: BudgetWarning,
    },
}

/// Fan-out of [`UsageEvent`]s to any number of listeners
///
/// Publishing never waits on a listener. One that falls more than
/// `capacity` events behind gets `RecvError::Lagged` and resumes from the
/// oldest event still buffered.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UsageEvent>,
}

impl EventBus {
    /// Bus buffering up to `capacity` undelivered events (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Listen for events published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UsageEvent> {
        self.tx.subscribe()
    }

    /// Deliver `event`, returning how many listeners got it
    pub fn publish(&self, event: UsageEvent) -> usize {
        match self.tx.send(event) {
            Ok(listeners) => listeners,
            Err(_) => 0,
        }
    }

    /// Live listeners
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
