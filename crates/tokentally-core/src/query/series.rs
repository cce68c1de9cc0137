//! Chart series
//!
//! Series walk a fixed window backward from "now" and are gap-filled: every
//! slot in the window appears, with a zero bucket when nothing was recorded.
//! Points are returned oldest first.

use super::UsageQuery;
use crate::usage::{day_key, hour_key, month_key, week_key, week_start, UsageBucket};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Series step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One point per hour
    Hour,
    /// One point per day
    #[default]
    Day,
    /// One point per week
    Week,
    /// One point per month
    Month,
}

impl Granularity {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(Self::Hour),
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(format!("unknown granularity: {}", other)),
        }
    }
}

/// What a chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMetric {
    /// Token totals
    #[default]
    Tokens,
    /// Estimated cost
    Cost,
}

impl FromStr for ChartMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tokens" => Ok(Self::Tokens),
            "cost" => Ok(Self::Cost),
            other => Err(format!("unknown chart metric: {}", other)),
        }
    }
}

/// One slot of a chart series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Period key
    pub key: String,
    /// Usage in the period (zero when absent)
    pub bucket: UsageBucket,
    /// Estimated cost, `None` for hours (no per-model hourly data)
    pub cost: Option<f64>,
}

impl UsageQuery<'_> {
    /// `count` slots of `granularity`, oldest first, ending at "now"
    #[must_use]
    pub fn series(&self, granularity: Granularity, count: usize) -> Vec<SeriesPoint> {
        match granularity {
            Granularity::Hour => self.hourly_series(count),
            Granularity::Day => self.daily_series(count),
            Granularity::Week => self.weekly_series(count),
            Granularity::Month => self.monthly_series(count),
        }
    }

    /// Last `days` days including today
    #[must_use]
    pub fn daily_series(&self, days: usize) -> Vec<SeriesPoint> {
        let today = self.now.date();
        (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_signed(Duration::days(back as i64)))
            .map(|date| {
                let key = day_key(date);
                SeriesPoint {
                    bucket: self.day(&key),
                    cost: Some(self.day_cost(&key)),
                    key,
                }
            })
            .collect()
    }

    /// Last `weeks` week buckets including this one
    ///
    /// Walks bucket by bucket, so the short bucket closing a year is never
    /// skipped.
    #[must_use]
    pub fn weekly_series(&self, weeks: usize) -> Vec<SeriesPoint> {
        let mut points = Vec::with_capacity(weeks);
        let mut cursor = Some(self.now.date());
        while points.len() < weeks {
            let Some(date) = cursor else { break };
            let key = week_key(date);
            points.push(SeriesPoint {
                bucket: self.usage.by_week.get(&key).copied().unwrap_or_default(),
                cost: Some(self.week_cost(&key)),
                key,
            });
            cursor = week_start(date).pred_opt();
        }
        points.reverse();
        points
    }

    /// Last `months` months including this one
    #[must_use]
    pub fn monthly_series(&self, months: usize) -> Vec<SeriesPoint> {
        let first = first_of_month(self.now.date());
        (0..months)
            .rev()
            .filter_map(|back| first.checked_sub_months(Months::new(back as u32)))
            .map(|date| {
                let key = month_key(date);
                SeriesPoint {
                    bucket: self.usage.by_month.get(&key).copied().unwrap_or_default(),
                    cost: Some(self.month_cost(&key)),
                    key,
                }
            })
            .collect()
    }

    /// Last `hours` hours including the current one
    #[must_use]
    pub fn hourly_series(&self, hours: usize) -> Vec<SeriesPoint> {
        let current = truncate_to_hour(self.now);
        (0..hours)
            .rev()
            .filter_map(|back| current.checked_sub_signed(Duration::hours(back as i64)))
            .map(|at| {
                let key = hour_key(at);
                SeriesPoint {
                    bucket: self.usage.by_hour.get(&key).copied().unwrap_or_default(),
                    cost: None,
                    key,
                }
            })
            .collect()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

fn truncate_to_hour(at: NaiveDateTime) -> NaiveDateTime {
    at.date()
        .and_hms_opt(at.hour(), 0, 0)
        .unwrap_or(at)
}
