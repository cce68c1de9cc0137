//! Lifecycle state machine
//!
//! At most one generation is tracked at a time. Input counting starts on
//! request-ready in a spawned task and is joined when the result arrives, so
//! tokenization overlaps the host's network call.
//!
//! A second request-ready while one is pending replaces it: the earlier
//! counting task is aborted and that generation is never recorded.

use super::{ChatContext, ChatMessage, GenerationKind, HostEvent, MessageSource};
use crate::interceptor::InterceptScope;
use crate::ledger::UsageLedger;
use std::sync::Arc;
use tokentally_llm::{PromptPayload, TokenCounter};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Correlation record between request-ready and the result
#[derive(Debug)]
struct PendingGeneration {
    input_tokens: JoinHandle<usize>,
    model_id: Option<String>,
    chat_id: Option<String>,
    kind: GenerationKind,
    baseline: usize,
}

#[derive(Debug, Default)]
enum TrackerState {
    #[default]
    Idle,
    Awaiting(PendingGeneration),
}

#[derive(Debug, Default)]
struct TrackerInner {
    state: TrackerState,
    /// Kind announced by the latest generation-started
    kind: GenerationKind,
    /// Token count of the message a `continue` extends
    baseline: usize,
}

impl TrackerInner {
    fn take_pending(&mut self) -> Option<PendingGeneration> {
        match std::mem::take(&mut self.state) {
            TrackerState::Awaiting(pending) => Some(pending),
            TrackerState::Idle => None,
        }
    }

    fn take_quiet(&mut self) -> Option<PendingGeneration> {
        let quiet = matches!(
            &self.state,
            TrackerState::Awaiting(pending) if pending.kind == GenerationKind::Quiet
        );
        if quiet {
            self.take_pending()
        } else {
            None
        }
    }

    fn clear_flags(&mut self) {
        self.kind = GenerationKind::Normal;
        self.baseline = 0;
    }
}

/// Turns host generation events into recordings
pub struct LifecycleTracker {
    inner: Mutex<TrackerInner>,
    counter: TokenCounter,
    ledger: Arc<UsageLedger>,
    chat: Arc<dyn ChatContext>,
    scope: InterceptScope,
}

impl std::fmt::Debug for LifecycleTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleTracker")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl LifecycleTracker {
    /// Create a tracker recording into `ledger`
    #[must_use]
    pub fn new(
        counter: TokenCounter,
        ledger: Arc<UsageLedger>,
        chat: Arc<dyn ChatContext>,
        scope: InterceptScope,
    ) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            counter,
            ledger,
            chat,
            scope,
        }
    }

    /// Whether a generation is awaiting its result
    pub async fn is_awaiting(&self) -> bool {
        matches!(self.inner.lock().await.state, TrackerState::Awaiting(_))
    }

    /// Dispatch one host event
    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::GenerationStarted { kind, dry_run } => {
                self.on_generation_started(kind, dry_run).await;
            }
            HostEvent::RequestReady { payload, dry_run } => {
                self.on_request_ready(payload, dry_run).await;
            }
            HostEvent::MessageReceived { index, source } => {
                self.on_message_received(index, source).await;
            }
            HostEvent::GenerationStopped => self.on_generation_stopped().await,
            HostEvent::ImpersonationReady { text } => self.on_impersonation_ready(&text).await,
            HostEvent::ChatChanged { chat_id } => self.on_chat_changed(chat_id.as_deref()).await,
        }
    }

    /// A generation is about to start
    pub async fn on_generation_started(&self, kind: GenerationKind, dry_run: bool) {
        if dry_run {
            debug!(?kind, "dry run generation ignored");
            return;
        }

        let mut inner = self.inner.lock().await;
        if let Some(quiet) = inner.take_quiet() {
            debug!("flushing quiet generation before new start");
            self.flush_quiet(quiet).await;
        }

        inner.kind = kind;
        inner.baseline = 0;
        if kind == GenerationKind::Continue {
            if let Some(last) = self.chat.last_message() {
                inner.baseline = self.count_message(&last).await;
            }
        }
        debug!(?kind, baseline = inner.baseline, "generation started");
    }

    /// The outbound prompt is assembled; start counting it
    pub async fn on_request_ready(&self, payload: PromptPayload, dry_run: bool) {
        if dry_run {
            debug!("dry run request ignored");
            return;
        }
        if self.scope.is_active() {
            debug!("request inside interception scope ignored");
            return;
        }

        let model_id = self.chat.current_model();
        let chat_id = self.chat.chat_id();
        let counter = self.counter.clone();
        let input_tokens = tokio::spawn(async move { counter.count_prompt(&payload).await });

        let mut inner = self.inner.lock().await;
        if let Some(previous) = inner.take_pending() {
            warn!(
                model_id = previous.model_id.as_deref().unwrap_or("-"),
                "request-ready while a generation is pending; replacing it"
            );
            previous.input_tokens.abort();
        }

        let (kind, baseline) = (inner.kind, inner.baseline);
        debug!(model_id = model_id.as_deref().unwrap_or("-"), ?kind, "awaiting result");
        inner.state = TrackerState::Awaiting(PendingGeneration {
            input_tokens,
            model_id,
            chat_id,
            kind,
            baseline,
        });
    }

    /// A message landed in the chat log
    pub async fn on_message_received(&self, index: usize, source: MessageSource) {
        if !source.is_generated() {
            debug!(index, ?source, "non-generated message ignored");
            return;
        }

        let mut inner = self.inner.lock().await;
        let Some(pending) = inner.take_pending() else {
            debug!(index, "message received with no pending generation");
            return;
        };

        let output = match self.chat.message(index) {
            Some(message) => self.count_message(&message).await,
            None => {
                warn!(index, "received message not found in chat; output counted as 0");
                0
            }
        };
        self.finish(pending, output).await;
        inner.clear_flags();
    }

    /// The user stopped the generation; record the partial output
    pub async fn on_generation_stopped(&self) {
        let mut inner = self.inner.lock().await;
        let Some(pending) = inner.take_pending() else {
            debug!("generation stopped with no pending generation");
            return;
        };

        let partial = self.chat.streaming_text().unwrap_or_default();
        let output = self.counter.count_text(&partial).await;
        self.finish(pending, output).await;
        inner.clear_flags();
    }

    /// Impersonation text is ready
    pub async fn on_impersonation_ready(&self, text: &str) {
        let mut inner = self.inner.lock().await;
        let Some(pending) = inner.take_pending() else {
            debug!("impersonation ready with no pending generation");
            return;
        };

        let output = self.counter.count_text(text).await;
        self.finish(pending, output).await;
        inner.clear_flags();
    }

    /// The host switched conversations
    ///
    /// A pending quiet generation is flushed; any other pending generation
    /// is dropped unrecorded.
    pub async fn on_chat_changed(&self, chat_id: Option<&str>) {
        {
            let mut inner = self.inner.lock().await;
            if let Some(quiet) = inner.take_quiet() {
                debug!("flushing quiet generation before chat change");
                self.flush_quiet(quiet).await;
            } else if let Some(abandoned) = inner.take_pending() {
                debug!(
                    model_id = abandoned.model_id.as_deref().unwrap_or("-"),
                    "discarding generation abandoned by chat change"
                );
                abandoned.input_tokens.abort();
            }
            inner.clear_flags();
        }
        self.ledger.notify_chat_changed(chat_id);
    }

    async fn flush_quiet(&self, pending: PendingGeneration) {
        let partial = self.chat.streaming_text().unwrap_or_default();
        let output = self.counter.count_text(&partial).await;
        self.finish(pending, output).await;
    }

    async fn count_message(&self, message: &ChatMessage) -> usize {
        self.counter
            .count_output(
                message.token_count,
                &message.text,
                message.reasoning.as_deref(),
            )
            .await
    }

    async fn finish(&self, pending: PendingGeneration, output: usize) {
        let output = if pending.kind == GenerationKind::Continue && pending.baseline > 0 {
            output.saturating_sub(pending.baseline)
        } else {
            output
        };

        let input = match pending.input_tokens.await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "input token count failed; recording 0 input");
                0
            }
        };

        self.ledger
            .record(
                input as u64,
                output as u64,
                pending.chat_id.as_deref(),
                pending.model_id.as_deref(),
            )
            .await;
    }
}
