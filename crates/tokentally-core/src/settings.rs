//! Settings persistence
//!
//! Everything persistent lives in one settings blob: the usage store, model
//! colors, model prices and presentation preferences. The blob is written
//! through on every change.

use crate::error::{Error, Result};
use crate::query::{ChartMetric, Granularity};
use crate::usage::{migrate_usage_value, UsageStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokentally_llm::ModelPrice;
use tracing::{debug, info};

/// Default data directory, relative to home
const DEFAULT_DATA_DIR: &str = ".tokentally";

/// Settings file name inside the data directory
const SETTINGS_FILE: &str = "settings.json";

/// User preferences (thresholds and chart defaults)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Warn when today's tokens reach this many (0 disables)
    #[serde(default)]
    pub daily_token_warning: u64,
    /// Warn when this month's cost reaches this many USD (0 disables)
    #[serde(default)]
    pub monthly_budget_usd: f64,
    /// Default chart granularity
    #[serde(default)]
    pub chart_range: Granularity,
    /// Default chart metric
    #[serde(default)]
    pub chart_metric: ChartMetric,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            daily_token_warning: 0,
            monthly_budget_usd: 0.0,
            chart_range: Granularity::Day,
            chart_metric: ChartMetric::Tokens,
        }
    }
}

/// The persisted settings blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Aggregates
    #[serde(default)]
    pub usage: UsageStore,
    /// Assigned chart colors, `#rrggbb`
    #[serde(default)]
    pub model_colors: BTreeMap<String, String>,
    /// User-configured prices
    #[serde(default)]
    pub model_prices: BTreeMap<String, ModelPrice>,
    /// Preferences
    #[serde(default)]
    pub preferences: Preferences,
}

impl Settings {
    /// Decode a raw blob, upgrading legacy usage entries first
    ///
    /// Returns the settings and the number of migrated entries.
    pub fn from_value(mut value: Value) -> Result<(Self, usize)> {
        let migrated = value
            .get_mut("usage")
            .map(migrate_usage_value)
            .unwrap_or(0);
        let settings = serde_json::from_value(value)?;
        Ok((settings, migrated))
    }
}

/// Persistent home of the settings blob
pub trait SettingsStore: Send + Sync {
    /// Read the raw blob, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<Value>>;

    /// Write the blob
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Default data directory (`~/.tokentally`)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Settings stored as pretty JSON in `<data_dir>/settings.json`
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    /// Store inside `data_dir`
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SETTINGS_FILE),
        }
    }

    /// Path of the settings file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no settings file yet");
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Storage(format!("Failed to read settings {:?}: {}", self.path, e))
        })?;
        let value = serde_json::from_str(&content)?;
        Ok(Some(value))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create data directory {:?}: {}", parent, e))
            })?;
        }

        let content = serde_json::to_string_pretty(settings)?;

        // write-then-rename so a crash never leaves a truncated blob
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| {
            Error::Storage(format!("Failed to write settings to {:?}: {}", tmp, e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Storage(format!("Failed to replace settings {:?}: {}", self.path, e))
        })?;

        debug!(path = ?self.path, "settings saved");
        Ok(())
    }
}

/// In-memory settings store
#[derive(Debug, Default)]
pub struct MemorySettings {
    value: Mutex<Option<Value>>,
    saves: Mutex<usize>,
}

impl MemorySettings {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw blob
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            saves: Mutex::new(0),
        }
    }

    /// Last saved blob
    #[must_use]
    pub fn saved(&self) -> Option<Value> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of saves so far
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.saved())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let value = serde_json::to_value(settings)?;
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Load settings from `store`, creating defaults when absent
///
/// Migrated legacy data is written back once.
pub fn load_settings(store: &dyn SettingsStore) -> Result<Settings> {
    let Some(value) = store.load()? else {
        return Ok(Settings::default());
    };

    let (settings, migrated) = Settings::from_value(value)?;
    if migrated > 0 {
        info!(migrated, "upgraded legacy per-model usage entries");
        store.save(&settings)?;
    }
    Ok(settings)
}
