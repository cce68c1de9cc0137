//! Usage Store - persisted aggregates
//!
//! This module contains the aggregate data structure every recording folds
//! into: all-time, per day/hour/week/month, per chat and per model.
//!
//! # Module Structure
//!
//! - `bucket`: bucket types and the `UsageStore` itself
//! - `keys`: period key derivation from local time
//! - `migrate`: one-time upgrade of legacy per-model day entries

mod bucket;
pub mod keys;
mod migrate;

#[cfg(test)]
mod tests;

pub use bucket::{DayBucket, ModelBucket, UsageBucket, UsageStore};
pub use keys::{day_key, hour_key, month_key, parse_day_key, week_key, week_start, PeriodKeys};
pub use migrate::{migrate_usage_value, split_legacy};
