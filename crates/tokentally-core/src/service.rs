//! UsageService - the accounting engine's public surface
//!
//! Wires the ledger, lifecycle tracker and interceptor together around one
//! token counter and one interception scope handle, and exposes the read API the
//! presentation layer uses.

use crate::error::Result;
use crate::event_bus::UsageEvent;
use crate::interceptor::{InterceptScope, RequestInterceptor};
use crate::ledger::UsageLedger;
use crate::lifecycle::{ChatContext, HostEvent, LifecycleTracker};
use crate::query::{Granularity, ModelBreakdown, SeriesPoint, StatsSnapshot, UsageQuery};
use crate::usage::UsageBucket;
use std::sync::Arc;
use tokentally_llm::TokenCounter;
use tokio::sync::broadcast;

/// Facade over the accounting engine
#[derive(Debug)]
pub struct UsageService {
    counter: TokenCounter,
    ledger: Arc<UsageLedger>,
    tracker: LifecycleTracker,
    interceptor: RequestInterceptor,
}

impl UsageService {
    /// Assemble the engine around `ledger`
    #[must_use]
    pub fn new(counter: TokenCounter, ledger: Arc<UsageLedger>, chat: Arc<dyn ChatContext>) -> Self {
        let scope = InterceptScope::new();
        let tracker = LifecycleTracker::new(
            counter.clone(),
            ledger.clone(),
            chat.clone(),
            scope,
        );
        let interceptor = RequestInterceptor::new(counter.clone(), ledger.clone(), chat, scope);
        Self {
            counter,
            ledger,
            tracker,
            interceptor,
        }
    }

    /// Feed one host event to the lifecycle tracker
    pub async fn handle(&self, event: HostEvent) {
        self.tracker.handle(event).await;
    }

    /// The lifecycle tracker
    #[must_use]
    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    /// Wrapper for background requests
    #[must_use]
    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    /// The ledger
    #[must_use]
    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    /// Name of the active tokenizer
    #[must_use]
    pub fn tokenizer_name(&self) -> &str {
        self.counter.tokenizer_name()
    }

    /// Run `f` against a query view at the ledger's "now"
    pub async fn query<R>(&self, f: impl FnOnce(&UsageQuery<'_>) -> R) -> R {
        let now = self.ledger.now();
        self.ledger
            .read(|settings| {
                let query = UsageQuery::new(&settings.usage, &settings.model_prices, now);
                f(&query)
            })
            .await
    }

    /// Current views plus raw bucket maps
    pub async fn stats(&self) -> StatsSnapshot {
        let tokenizer = self.tokenizer_name().to_string();
        self.query(|q| q.snapshot(&tokenizer)).await
    }

    /// Sum of days `start..=end` (`YYYY-MM-DD`)
    pub async fn usage_for_range(&self, start: &str, end: &str) -> Result<UsageBucket> {
        self.query(|q| q.range(start, end)).await
    }

    /// One chat's usage
    pub async fn chat_usage(&self, chat_id: &str) -> UsageBucket {
        self.query(|q| q.chat(chat_id)).await
    }

    /// Gap-filled chart series ending now
    pub async fn series(&self, granularity: Granularity, count: usize) -> Vec<SeriesPoint> {
        self.query(|q| q.series(granularity, count)).await
    }

    /// Per-model usage and cost, assigning colors to models that lack one
    pub async fn model_breakdown(&self) -> Vec<ModelBreakdown> {
        let models: Vec<String> = self
            .ledger
            .read(|s| s.usage.by_model.keys().cloned().collect())
            .await;
        for model in &models {
            self.ledger.color_for(model).await;
        }

        let colors = self.ledger.read(|s| s.model_colors.clone()).await;
        self.query(|q| q.model_breakdown(&colors)).await
    }

    /// Clear all usage
    pub async fn reset_all_usage(&self) -> Result<()> {
        self.ledger.reset().await
    }

    /// Record usage directly
    pub async fn record(&self, input: u64, output: u64, chat_id: Option<&str>, model_id: Option<&str>) {
        self.ledger.record(input, output, chat_id, model_id).await;
    }

    /// Count tokens in text with the active tokenizer
    pub async fn count_tokens(&self, text: &str) -> usize {
        self.counter.count_text(text).await
    }

    /// Subscribe to usage notifications; drop the receiver to unsubscribe
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UsageEvent> {
        self.ledger.bus().subscribe()
    }
}
