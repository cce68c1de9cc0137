//! Import and export of usage data
//!
//! Export writes `{exportDate, usage, modelPrices, modelColors}`. Import
//! accepts the same document, upgrades legacy usage entries, then merges or
//! replaces. A document is fully validated before anything is applied.

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::usage::{migrate_usage_value, UsageStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tokentally_llm::ModelPrice;

/// How an imported document combines with local data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add every bucket field-wise; keep local prices and colors
    #[default]
    Merge,
    /// Overwrite usage, prices and colors wholesale
    Replace,
}

impl ImportMode {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown import mode: {}", other)),
        }
    }
}

/// Exported snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// When the export was taken
    pub export_date: DateTime<Utc>,
    /// Aggregates
    pub usage: UsageStore,
    /// Configured prices
    #[serde(default)]
    pub model_prices: BTreeMap<String, ModelPrice>,
    /// Assigned colors
    #[serde(default)]
    pub model_colors: BTreeMap<String, String>,
}

impl ExportDocument {
    /// Snapshot `settings` at `export_date`
    #[must_use]
    pub fn from_settings(settings: &Settings, export_date: DateTime<Utc>) -> Self {
        Self {
            export_date,
            usage: settings.usage.clone(),
            model_prices: settings.model_prices.clone(),
            model_colors: settings.model_colors.clone(),
        }
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A validated import document, ready to apply
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDocument {
    /// Imported aggregates
    pub usage: UsageStore,
    /// Imported prices
    pub model_prices: BTreeMap<String, ModelPrice>,
    /// Imported colors
    pub model_colors: BTreeMap<String, String>,
    /// Legacy entries upgraded while parsing
    pub migrated: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImport {
    usage: UsageStore,
    #[serde(default)]
    model_prices: BTreeMap<String, ModelPrice>,
    #[serde(default)]
    model_colors: BTreeMap<String, String>,
}

impl ImportDocument {
    /// Parse import text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidImport(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate and decode a raw document
    ///
    /// `usage` must be an object; `exportDate` is informational and optional.
    pub fn from_value(mut value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidImport(
                "document is not a JSON object".to_string(),
            ));
        }
        let migrated = match value.get_mut("usage") {
            Some(usage) if usage.is_object() => migrate_usage_value(usage),
            Some(_) => {
                return Err(Error::InvalidImport("`usage` is not an object".to_string()));
            }
            None => return Err(Error::InvalidImport("missing `usage`".to_string())),
        };

        let raw: RawImport = serde_json::from_value(value)
            .map_err(|e| Error::InvalidImport(format!("malformed document: {}", e)))?;
        Ok(Self {
            usage: raw.usage,
            model_prices: raw.model_prices,
            model_colors: raw.model_colors,
            migrated,
        })
    }
}

/// What an import changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Mode applied
    pub mode: ImportMode,
    /// Days in the imported usage
    pub days: usize,
    /// Tokens in the imported all-time bucket
    pub tokens: u64,
    /// Prices added or replaced
    pub prices: usize,
    /// Colors added or replaced
    pub colors: usize,
    /// Legacy entries upgraded
    pub migrated: usize,
}

/// Apply a validated document to `settings`
pub fn apply_import(settings: &mut Settings, doc: ImportDocument, mode: ImportMode) -> ImportSummary {
    let days = doc.usage.by_day.len();
    let tokens = doc.usage.all_time.total;

    let (prices, colors) = match mode {
        ImportMode::Merge => {
            settings.usage.merge(&doc.usage);
            let prices = insert_missing(&mut settings.model_prices, doc.model_prices);
            let colors = insert_missing(&mut settings.model_colors, doc.model_colors);
            (prices, colors)
        }
        ImportMode::Replace => {
            let counts = (doc.model_prices.len(), doc.model_colors.len());
            settings.usage = doc.usage;
            settings.model_prices = doc.model_prices;
            settings.model_colors = doc.model_colors;
            counts
        }
    };

    ImportSummary {
        mode,
        days,
        tokens,
        prices,
        colors,
        migrated: doc.migrated,
    }
}

fn insert_missing<V>(into: &mut BTreeMap<String, V>, from: BTreeMap<String, V>) -> usize {
    let mut added = 0;
    for (key, value) in from {
        if !into.contains_key(&key) {
            into.insert(key, value);
            added += 1;
        }
    }
    added
}
