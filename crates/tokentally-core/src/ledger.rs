//! Usage Ledger - the single writer of the usage store
//!
//! Every mutation of persisted state goes through here and is serialized by
//! one write lock: a recording updates all buckets before anything can
//! observe them, then budget checks run, the blob is written through, and
//! subscribers are notified.
//!
//! Writes run on tokio's blocking pool while the write lock is held, so saves
//! land in the order the mutations happened.

use crate::budget::{BudgetLimits, BudgetMonitor, BudgetReading};
use crate::clock::Clock;
use crate::colors::{assign_color, ColorPolicy};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, UsageEvent};
use crate::query::{ChartMetric, Granularity, UsageQuery};
use crate::settings::{load_settings, Settings, SettingsStore};
use crate::transfer::{apply_import, ExportDocument, ImportDocument, ImportMode, ImportSummary};
use crate::usage::{PeriodKeys, UsageStore};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use tokentally_llm::ModelPrice;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Convert an externally supplied count to tokens
///
/// Non-finite and negative values become zero; fractions round.
#[must_use]
pub fn clamp_token_count(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round() as u64
}

struct LedgerState {
    settings: Settings,
    budget: BudgetMonitor,
}

/// Serialized owner of the settings blob
pub struct UsageLedger {
    state: RwLock<LedgerState>,
    store: Arc<dyn SettingsStore>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    colors: ColorPolicy,
}

impl std::fmt::Debug for UsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLedger")
            .field("colors", &self.colors)
            .finish_non_exhaustive()
    }
}

impl UsageLedger {
    /// Load settings from `store` (migrating legacy data) and take ownership
    pub fn open(store: Arc<dyn SettingsStore>, bus: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let settings = load_settings(store.as_ref())?;
        debug!(
            days = settings.usage.by_day.len(),
            all_time = settings.usage.all_time.total,
            "usage ledger opened"
        );
        Ok(Self {
            state: RwLock::new(LedgerState {
                settings,
                budget: BudgetMonitor::new(),
            }),
            store,
            bus,
            clock,
            colors: ColorPolicy::default(),
        })
    }

    /// Use a custom color assignment policy
    #[must_use]
    pub fn with_color_policy(mut self, colors: ColorPolicy) -> Self {
        self.colors = colors;
        self
    }

    /// The notification bus
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current local time from the injected clock
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Apply one recording to every affected bucket
    ///
    /// Never fails: persistence errors are logged and the in-memory store
    /// keeps the recording.
    pub async fn record(&self, input: u64, output: u64, chat_id: Option<&str>, model_id: Option<&str>) {
        let now = self.clock.now();
        let keys = PeriodKeys::at(now);

        let warnings = {
            let mut state = self.state.write().await;
            let LedgerState { settings, budget } = &mut *state;

            settings.usage.apply(&keys, input, output, chat_id, model_id);

            let limits = BudgetLimits {
                daily_token_warning: settings.preferences.daily_token_warning,
                monthly_budget_usd: settings.preferences.monthly_budget_usd,
            };
            let query = UsageQuery::new(&settings.usage, &settings.model_prices, now);
            let reading = BudgetReading {
                day: &keys.day,
                day_tokens: query.today().total,
                month: &keys.month,
                month_cost: query.month_cost(&keys.month),
            };
            let warnings = budget.evaluate(&limits, &reading);

            if let Err(e) = self.persist(settings).await {
                warn!(error = %e, "failed to persist usage after recording");
            }
            warnings
        };

        info!(
            input,
            output,
            chat_id = chat_id.unwrap_or("-"),
            model_id = model_id.unwrap_or("-"),
            "recorded usage"
        );
        self.bus.publish(UsageEvent::Recorded {
            input,
            output,
            chat_id: chat_id.map(str::to_string),
            model_id: model_id.map(str::to_string),
            day: keys.day,
        });
        for warning in warnings {
            warn!(%warning, "budget threshold crossed");
            self.bus.publish(UsageEvent::BudgetWarning { warning });
        }
    }

    /// Record externally supplied counts, clamping invalid values to zero
    pub async fn record_raw(&self, input: f64, output: f64, chat_id: Option<&str>, model_id: Option<&str>) {
        self.record(
            clamp_token_count(input),
            clamp_token_count(output),
            chat_id,
            model_id,
        )
        .await;
    }

    /// Clear all usage in one step; prices, colors and preferences survive
    pub async fn reset(&self) -> Result<()> {
        self.update(|settings| settings.usage = UsageStore::default())
            .await?;
        self.state.write().await.budget.clear();
        info!("all usage reset");
        self.bus.publish(UsageEvent::Reset);
        Ok(())
    }

    /// Run `f` against the current settings
    pub async fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        let state = self.state.read().await;
        f(&state.settings)
    }

    /// Clone of the current settings
    pub async fn settings(&self) -> Settings {
        self.read(Settings::clone).await
    }

    /// Set a model's price
    pub async fn set_price(&self, model_id: &str, price: ModelPrice) -> Result<()> {
        self.update(|settings| {
            settings.model_prices.insert(model_id.to_string(), price);
        })
        .await?;
        info!(model_id, input = price.input_price_per_million, output = price.output_price_per_million, "price updated");
        Ok(())
    }

    /// Remove a model's price; returns whether one was set
    pub async fn remove_price(&self, model_id: &str) -> Result<bool> {
        let mut removed = false;
        self.update(|settings| removed = settings.model_prices.remove(model_id).is_some())
            .await?;
        Ok(removed)
    }

    /// Set the daily token warning and monthly budget
    pub async fn set_limits(&self, limits: BudgetLimits) -> Result<()> {
        self.update(|settings| {
            settings.preferences.daily_token_warning = limits.daily_token_warning;
            settings.preferences.monthly_budget_usd = limits.monthly_budget_usd.max(0.0);
        })
        .await?;
        self.state.write().await.budget.clear();
        info!(
            daily_tokens = limits.daily_token_warning,
            monthly_usd = limits.monthly_budget_usd,
            "budget limits updated"
        );
        Ok(())
    }

    /// Set the default chart granularity and metric
    pub async fn set_chart_preferences(&self, range: Granularity, metric: ChartMetric) -> Result<()> {
        self.update(|settings| {
            settings.preferences.chart_range = range;
            settings.preferences.chart_metric = metric;
        })
        .await
    }

    /// Color for a model, assigned and persisted on first request
    pub async fn color_for(&self, model_id: &str) -> String {
        if let Some(color) = self.read(|s| s.model_colors.get(model_id).cloned()).await {
            return color;
        }

        let mut state = self.state.write().await;
        // another caller may have assigned it while we waited
        if let Some(color) = state.settings.model_colors.get(model_id) {
            return color.clone();
        }

        let color = assign_color(
            state.settings.model_colors.values().map(String::as_str),
            &self.colors,
            &mut rand::thread_rng(),
        );
        state
            .settings
            .model_colors
            .insert(model_id.to_string(), color.clone());
        if let Err(e) = self.persist(&state.settings).await {
            warn!(error = %e, model_id, "failed to persist model color");
        }
        debug!(model_id, %color, "assigned model color");
        color
    }

    /// Snapshot for export
    pub async fn export(&self) -> ExportDocument {
        let state = self.state.read().await;
        ExportDocument::from_settings(&state.settings, Utc::now())
    }

    /// Apply a validated import document
    ///
    /// Nothing changes when persisting the result fails.
    pub async fn import(&self, doc: ImportDocument, mode: ImportMode) -> Result<ImportSummary> {
        let mut summary = None;
        self.update(|settings| summary = Some(apply_import(settings, doc, mode)))
            .await?;
        self.state.write().await.budget.clear();

        let summary = summary.ok_or_else(|| {
            Error::Internal("import produced no summary".to_string())
        })?;
        info!(
            mode = %mode,
            days = summary.days,
            tokens = summary.tokens,
            migrated = summary.migrated,
            "usage imported"
        );
        self.bus.publish(UsageEvent::Imported { mode });
        Ok(summary)
    }

    /// Tell subscribers the host switched conversations
    pub fn notify_chat_changed(&self, chat_id: Option<&str>) {
        self.bus.publish(UsageEvent::ChatChanged {
            chat_id: chat_id.map(str::to_string),
        });
    }

    /// Apply `f` to a copy, persist it, then swap it in
    async fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut state = self.state.write().await;
        let mut next = state.settings.clone();
        f(&mut next);
        self.persist(&next).await?;
        state.settings = next;
        Ok(())
    }

    async fn persist(&self, settings: &Settings) -> Result<()> {
        let store = self.store.clone();
        let snapshot = settings.clone();
        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| Error::Internal(format!("settings writer failed: {e}")))?
    }
}
