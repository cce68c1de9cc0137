//! Tokentally Core - Token usage accounting engine
//!
//! This crate provides the core functionality for Tokentally:
//! - Usage: aggregate buckets by time window, chat and model
//! - Ledger: serialized recording, budget checks and write-through persistence
//! - Lifecycle: correlation of host generation events into recordings
//! - Interceptor: accounting for background requests
//! - Query: read-only views, costs and chart series
//! - Transfer: import/export documents
//! - Service: the facade tying these together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod budget;
pub mod clock;
pub mod colors;
pub mod error;
pub mod event_bus;
pub mod interceptor;
pub mod ledger;
pub mod lifecycle;
pub mod query;
pub mod service;
pub mod settings;
pub mod transfer;
pub mod usage;

pub use budget::{BudgetCheck, BudgetLimits, BudgetMonitor, BudgetWarning, WarningLevel};
pub use clock::{Clock, FixedClock, SystemClock};
pub use colors::ColorPolicy;
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, UsageEvent};
pub use interceptor::{InterceptScope, RequestInterceptor, ResponseText};
pub use ledger::{clamp_token_count, UsageLedger};
pub use lifecycle::{
    ChatContext, ChatMessage, GenerationKind, HostEvent, LifecycleTracker, MessageSource, NoChat,
};
pub use query::{
    ChartMetric, Granularity, ModelBreakdown, SeriesPoint, StatsSnapshot, UsageQuery,
};
pub use service::UsageService;
pub use settings::{
    default_data_dir, JsonFileSettings, MemorySettings, Preferences, Settings, SettingsStore,
};
pub use transfer::{ExportDocument, ImportDocument, ImportMode, ImportSummary};
pub use usage::{DayBucket, ModelBucket, UsageBucket, UsageStore};
