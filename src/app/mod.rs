//! Application wiring
//!
//! Builds the accounting engine from configuration: tokenizer, settings
//! store, ledger and service facade.

pub mod config;
mod loader;

pub use config::AppConfig;
pub use loader::load_config;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokentally_core::{
    EventBus, JsonFileSettings, NoChat, SystemClock, UsageLedger, UsageService,
};
use tokentally_llm::{TokenCounter, TokenizerKind};
use tracing::debug;

/// A ready-to-use engine plus the configuration it was built from
pub struct App {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub service: UsageService,
}

impl App {
    /// Build the engine described by `config`
    pub fn open(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        debug!(data_dir = %data_dir.display(), "opening usage data");

        let kind: TokenizerKind = config
            .tokenizer
            .encoding
            .parse()
            .context("Invalid tokenizer.encoding")?;
        let tokenizer = kind
            .build(config.tokenizer.chars_per_token)
            .with_context(|| format!("Failed to load tokenizer {}", kind))?;
        let counter =
            TokenCounter::new(tokenizer).with_fallback_ratio(config.tokenizer.chars_per_token);

        let store = Arc::new(JsonFileSettings::new(&data_dir));
        let ledger = UsageLedger::open(
            store,
            EventBus::new(config.events.capacity),
            Arc::new(SystemClock),
        )
        .with_context(|| format!("Failed to open usage data in {}", data_dir.display()))?
        .with_color_policy((&config.colors).into());

        let service = UsageService::new(counter, Arc::new(ledger), Arc::new(NoChat));
        Ok(Self {
            config,
            data_dir,
            service,
        })
    }

    /// Load configuration and build the engine
    pub fn load() -> Result<Self> {
        Self::open(load_config()?)
    }
}
