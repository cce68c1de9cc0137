//! Application configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokentally_core::{default_data_dir, ColorPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Settings blob directory; `~` expands to the home directory
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub colors: ColorsConfig,
}

impl AppConfig {
    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => default_data_dir(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

fn default_encoding() -> String {
    "cl100k_base".to_string()
}

fn default_chars_per_token() -> f64 {
    tokentally_llm::DEFAULT_CHARS_PER_TOKEN
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    256
}

/// Default series windows per granularity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartsConfig {
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_weeks")]
    pub weeks: usize,
    #[serde(default = "default_months")]
    pub months: usize,
    #[serde(default = "default_hours")]
    pub hours: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            weeks: default_weeks(),
            months: default_months(),
            hours: default_hours(),
        }
    }
}

fn default_days() -> usize {
    30
}

fn default_weeks() -> usize {
    12
}

fn default_months() -> usize {
    12
}

fn default_hours() -> usize {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorsConfig {
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl From<&ColorsConfig> for ColorPolicy {
    fn from(config: &ColorsConfig) -> Self {
        ColorPolicy {
            min_distance: config.min_distance,
            max_attempts: config.max_attempts,
        }
    }
}

fn default_min_distance() -> f64 {
    tokentally_core::colors::DEFAULT_MIN_DISTANCE
}

fn default_max_attempts() -> u32 {
    tokentally_core::colors::DEFAULT_MAX_ATTEMPTS
}
