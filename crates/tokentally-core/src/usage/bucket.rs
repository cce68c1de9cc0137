//! Aggregate buckets and the usage store

use super::keys::PeriodKeys;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate counter for one time window or dimension
///
/// `total == input + output` holds at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBucket {
    /// Input tokens
    #[serde(default)]
    pub input: u64,
    /// Output tokens
    #[serde(default)]
    pub output: u64,
    /// Input plus output
    #[serde(default)]
    pub total: u64,
    /// Recordings that touched this bucket
    #[serde(default)]
    pub message_count: u64,
}

impl UsageBucket {
    /// Apply one recording
    pub fn add(&mut self, input: u64, output: u64) {
        self.input = self.input.saturating_add(input);
        self.output = self.output.saturating_add(output);
        self.total = self.total.saturating_add(input.saturating_add(output));
        self.message_count = self.message_count.saturating_add(1);
    }

    /// Field-wise addition
    pub fn merge(&mut self, other: &UsageBucket) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.total = self.total.saturating_add(other.total);
        self.message_count = self.message_count.saturating_add(other.message_count);
    }

    /// Whether nothing was ever recorded here
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-model counter inside a day (no message count)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBucket {
    /// Input tokens
    #[serde(default)]
    pub input: u64,
    /// Output tokens
    #[serde(default)]
    pub output: u64,
    /// Input plus output
    #[serde(default)]
    pub total: u64,
}

impl ModelBucket {
    /// Apply one recording
    pub fn add(&mut self, input: u64, output: u64) {
        self.input = self.input.saturating_add(input);
        self.output = self.output.saturating_add(output);
        self.total = self.total.saturating_add(input.saturating_add(output));
    }

    /// Field-wise addition
    pub fn merge(&mut self, other: &ModelBucket) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.total = self.total.saturating_add(other.total);
    }
}

/// One day's usage with its per-model breakdown
///
/// The models' totals never exceed the day total; they may fall short when
/// some recordings carried no model id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    /// Input tokens
    #[serde(default)]
    pub input: u64,
    /// Output tokens
    #[serde(default)]
    pub output: u64,
    /// Input plus output
    #[serde(default)]
    pub total: u64,
    /// Recordings on this day
    #[serde(default)]
    pub message_count: u64,
    /// Per-model breakdown
    #[serde(default)]
    pub models: BTreeMap<String, ModelBucket>,
}

impl DayBucket {
    /// The day's aggregate without the model breakdown
    #[must_use]
    pub fn bucket(&self) -> UsageBucket {
        UsageBucket {
            input: self.input,
            output: self.output,
            total: self.total,
            message_count: self.message_count,
        }
    }

    /// Apply one recording
    pub fn add(&mut self, input: u64, output: u64, model: Option<&str>) {
        self.input = self.input.saturating_add(input);
        self.output = self.output.saturating_add(output);
        self.total = self.total.saturating_add(input.saturating_add(output));
        self.message_count = self.message_count.saturating_add(1);
        if let Some(model) = model {
            self.models
                .entry(model.to_string())
                .or_default()
                .add(input, output);
        }
    }

    /// Field-wise addition including nested model entries
    pub fn merge(&mut self, other: &DayBucket) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.total = self.total.saturating_add(other.total);
        self.message_count = self.message_count.saturating_add(other.message_count);
        for (model, bucket) in &other.models {
            self.models.entry(model.clone()).or_default().merge(bucket);
        }
    }
}

/// Persisted aggregate data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStore {
    /// Everything ever recorded
    #[serde(default)]
    pub all_time: UsageBucket,
    /// Keyed by `YYYY-MM-DD`
    #[serde(default)]
    pub by_day: BTreeMap<String, DayBucket>,
    /// Keyed by `YYYY-MM-DDTHH`
    #[serde(default)]
    pub by_hour: BTreeMap<String, UsageBucket>,
    /// Keyed by `YYYY-Wnn`
    #[serde(default)]
    pub by_week: BTreeMap<String, UsageBucket>,
    /// Keyed by `YYYY-MM`
    #[serde(default)]
    pub by_month: BTreeMap<String, UsageBucket>,
    /// Keyed by chat id
    #[serde(default)]
    pub by_chat: BTreeMap<String, UsageBucket>,
    /// Keyed by model id
    #[serde(default)]
    pub by_model: BTreeMap<String, UsageBucket>,
}

impl UsageStore {
    /// Apply one recording to every affected bucket
    ///
    /// Chat and model buckets are skipped when the id is absent.
    pub fn apply(
        &mut self,
        keys: &PeriodKeys,
        input: u64,
        output: u64,
        chat_id: Option<&str>,
        model_id: Option<&str>,
    ) {
        self.all_time.add(input, output);
        self.by_day
            .entry(keys.day.clone())
            .or_default()
            .add(input, output, model_id);
        self.by_hour
            .entry(keys.hour.clone())
            .or_default()
            .add(input, output);
        self.by_week
            .entry(keys.week.clone())
            .or_default()
            .add(input, output);
        self.by_month
            .entry(keys.month.clone())
            .or_default()
            .add(input, output);
        if let Some(chat_id) = chat_id {
            self.by_chat
                .entry(chat_id.to_string())
                .or_default()
                .add(input, output);
        }
        if let Some(model_id) = model_id {
            self.by_model
                .entry(model_id.to_string())
                .or_default()
                .add(input, output);
        }
    }

    /// Numeric addition of every corresponding bucket
    pub fn merge(&mut self, other: &UsageStore) {
        self.all_time.merge(&other.all_time);
        for (key, day) in &other.by_day {
            self.by_day.entry(key.clone()).or_default().merge(day);
        }
        merge_map(&mut self.by_hour, &other.by_hour);
        merge_map(&mut self.by_week, &other.by_week);
        merge_map(&mut self.by_month, &other.by_month);
        merge_map(&mut self.by_chat, &other.by_chat);
        merge_map(&mut self.by_model, &other.by_model);
    }

    /// Whether nothing was ever recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_time.is_empty() && self.by_day.is_empty()
    }
}

fn merge_map(into: &mut BTreeMap<String, UsageBucket>, from: &BTreeMap<String, UsageBucket>) {
    for (key, bucket) in from {
        into.entry(key.clone()).or_default().merge(bucket);
    }
}
