//! Stats Query Layer - read-only views over the usage store
//!
//! Everything here is derived purely from a borrowed [`UsageStore`] and the
//! configured prices; nothing mutates. Missing keys read as zero buckets.

mod series;

#[cfg(test)]
mod tests;

pub use series::{ChartMetric, Granularity, SeriesPoint};

use crate::error::{Error, Result};
use crate::usage::{
    day_key, month_key, parse_day_key, week_key, DayBucket, PeriodKeys, UsageBucket, UsageStore,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use tokentally_llm::ModelPrice;

/// Everything the presentation layer needs in one read
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Today's bucket
    pub today: UsageBucket,
    /// This hour's bucket
    pub this_hour: UsageBucket,
    /// This week's bucket
    pub this_week: UsageBucket,
    /// This month's bucket
    pub this_month: UsageBucket,
    /// All-time bucket
    pub all_time: UsageBucket,
    /// All-time estimated cost (USD)
    pub all_time_cost: f64,
    /// Raw per-day buckets
    pub by_day: BTreeMap<String, DayBucket>,
    /// Raw per-hour buckets
    pub by_hour: BTreeMap<String, UsageBucket>,
    /// Raw per-week buckets
    pub by_week: BTreeMap<String, UsageBucket>,
    /// Raw per-month buckets
    pub by_month: BTreeMap<String, UsageBucket>,
    /// Raw per-chat buckets
    pub by_chat: BTreeMap<String, UsageBucket>,
    /// Raw per-model buckets
    pub by_model: BTreeMap<String, UsageBucket>,
    /// Current tokenizer name
    pub tokenizer: String,
}

/// One model's all-time usage with cost and chart color
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBreakdown {
    /// Model id
    pub model: String,
    /// All-time usage
    pub usage: UsageBucket,
    /// Estimated cost (USD)
    pub cost: f64,
    /// Assigned color, if any
    pub color: Option<String>,
}

/// Read-only query view at a fixed "now"
#[derive(Debug, Clone, Copy)]
pub struct UsageQuery<'a> {
    usage: &'a UsageStore,
    prices: &'a BTreeMap<String, ModelPrice>,
    now: NaiveDateTime,
}

impl<'a> UsageQuery<'a> {
    /// Create a view
    #[must_use]
    pub fn new(
        usage: &'a UsageStore,
        prices: &'a BTreeMap<String, ModelPrice>,
        now: NaiveDateTime,
    ) -> Self {
        Self { usage, prices, now }
    }

    /// Keys covering "now"
    #[must_use]
    pub fn keys(&self) -> PeriodKeys {
        PeriodKeys::at(self.now)
    }

    /// Today's usage
    #[must_use]
    pub fn today(&self) -> UsageBucket {
        self.day(&day_key(self.now.date()))
    }

    /// This hour's usage
    #[must_use]
    pub fn this_hour(&self) -> UsageBucket {
        lookup(&self.usage.by_hour, &self.keys().hour)
    }

    /// This week's usage
    #[must_use]
    pub fn this_week(&self) -> UsageBucket {
        lookup(&self.usage.by_week, &week_key(self.now.date()))
    }

    /// This month's usage
    #[must_use]
    pub fn this_month(&self) -> UsageBucket {
        lookup(&self.usage.by_month, &month_key(self.now.date()))
    }

    /// One day's usage
    #[must_use]
    pub fn day(&self, key: &str) -> UsageBucket {
        self.usage
            .by_day
            .get(key)
            .map(DayBucket::bucket)
            .unwrap_or_default()
    }

    /// Sum of day buckets with `start <= key <= end`
    ///
    /// Both bounds must be `YYYY-MM-DD`; an inverted range sums to zero.
    pub fn range(&self, start: &str, end: &str) -> Result<UsageBucket> {
        for key in [start, end] {
            if parse_day_key(key).is_none() {
                return Err(Error::InvalidDayKey(key.to_string()));
            }
        }

        let mut total = UsageBucket::default();
        if start > end {
            return Ok(total);
        }
        for day in self.usage.by_day.range(start.to_string()..=end.to_string()).map(|(_, d)| d) {
            total.merge(&day.bucket());
        }
        Ok(total)
    }

    /// One chat's usage
    #[must_use]
    pub fn chat(&self, chat_id: &str) -> UsageBucket {
        lookup(&self.usage.by_chat, chat_id)
    }

    /// One model's all-time usage
    #[must_use]
    pub fn model(&self, model_id: &str) -> UsageBucket {
        lookup(&self.usage.by_model, model_id)
    }

    /// Configured price, zero when unset
    #[must_use]
    pub fn price(&self, model_id: &str) -> ModelPrice {
        self.prices.get(model_id).copied().unwrap_or_default()
    }

    /// Cost of token counts at a model's price
    #[must_use]
    pub fn cost(&self, model_id: &str, input: u64, output: u64) -> f64 {
        self.price(model_id).calculate_cost(input, output)
    }

    /// All-time cost of one model
    #[must_use]
    pub fn cost_for_model(&self, model_id: &str) -> f64 {
        let usage = self.model(model_id);
        self.cost(model_id, usage.input, usage.output)
    }

    /// All-time cost across models
    #[must_use]
    pub fn all_time_cost(&self) -> f64 {
        self.usage
            .by_model
            .iter()
            .map(|(model, usage)| self.cost(model, usage.input, usage.output))
            .sum()
    }

    /// One day's cost from its per-model entries
    #[must_use]
    pub fn day_cost(&self, key: &str) -> f64 {
        self.usage
            .by_day
            .get(key)
            .map(|day| self.day_bucket_cost(day))
            .unwrap_or(0.0)
    }

    /// A month's cost, summed over its days
    #[must_use]
    pub fn month_cost(&self, month: &str) -> f64 {
        let prefix = format!("{}-", month);
        self.usage
            .by_day
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, day)| self.day_bucket_cost(day))
            .sum()
    }

    /// A week's cost, summed over days whose week key matches
    #[must_use]
    pub fn week_cost(&self, week: &str) -> f64 {
        self.usage
            .by_day
            .iter()
            .filter(|(key, _)| parse_day_key(key).is_some_and(|date| week_key(date) == week))
            .map(|(_, day)| self.day_bucket_cost(day))
            .sum()
    }

    /// Per-model all-time usage and cost, largest total first
    #[must_use]
    pub fn model_breakdown(&self, colors: &BTreeMap<String, String>) -> Vec<ModelBreakdown> {
        let mut models: Vec<ModelBreakdown> = self
            .usage
            .by_model
            .iter()
            .map(|(model, usage)| ModelBreakdown {
                model: model.clone(),
                usage: *usage,
                cost: self.cost(model, usage.input, usage.output),
                color: colors.get(model).cloned(),
            })
            .collect();
        models.sort_by(|a, b| b.usage.total.cmp(&a.usage.total).then(a.model.cmp(&b.model)));
        models
    }

    /// Full snapshot for the presentation layer
    #[must_use]
    pub fn snapshot(&self, tokenizer: &str) -> StatsSnapshot {
        StatsSnapshot {
            today: self.today(),
            this_hour: self.this_hour(),
            this_week: self.this_week(),
            this_month: self.this_month(),
            all_time: self.usage.all_time,
            all_time_cost: self.all_time_cost(),
            by_day: self.usage.by_day.clone(),
            by_hour: self.usage.by_hour.clone(),
            by_week: self.usage.by_week.clone(),
            by_month: self.usage.by_month.clone(),
            by_chat: self.usage.by_chat.clone(),
            by_model: self.usage.by_model.clone(),
            tokenizer: tokenizer.to_string(),
        }
    }

    fn day_bucket_cost(&self, day: &DayBucket) -> f64 {
        day.models
            .iter()
            .map(|(model, usage)| self.cost(model, usage.input, usage.output))
            .sum()
    }
}

fn lookup(map: &BTreeMap<String, UsageBucket>, key: &str) -> UsageBucket {
    map.get(key).copied().unwrap_or_default()
}
