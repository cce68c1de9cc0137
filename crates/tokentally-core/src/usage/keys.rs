//! Period keys
//!
//! - day: `YYYY-MM-DD`
//! - hour: `YYYY-MM-DDTHH`
//! - week: `YYYY-Wnn`
//! - month: `YYYY-MM`
//!
//! Week numbers are not ISO 8601. They count from January 1st shifted by
//! that day's weekday (Sunday = 0): `ceil((ordinal0 + jan1_weekday + 1) / 7)`.
//! Stored week keys depend on this exact formula.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Keys of every time bucket covering one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKeys {
    /// Day key
    pub day: String,
    /// Hour key
    pub hour: String,
    /// Week key
    pub week: String,
    /// Month key
    pub month: String,
}

impl PeriodKeys {
    /// Keys for local time `at`
    #[must_use]
    pub fn at(at: NaiveDateTime) -> Self {
        let date = at.date();
        Self {
            day: day_key(date),
            hour: hour_key(at),
            week: week_key(date),
            month: month_key(date),
        }
    }
}

/// `YYYY-MM-DD`
#[must_use]
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DDTHH`
#[must_use]
pub fn hour_key(at: NaiveDateTime) -> String {
    format!("{}T{:02}", day_key(at.date()), at.hour())
}

/// `YYYY-Wnn`, day-offset-from-January-1st numbering
#[must_use]
pub fn week_key(date: NaiveDate) -> String {
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|jan1| jan1.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let week = (date.ordinal0() + jan1_weekday + 1).div_ceil(7);
    format!("{}-W{:02}", date.year(), week)
}

/// First day of the week bucket containing `date`
///
/// Buckets run Sunday to Saturday, except that January 1st always opens
/// week 1, so the last bucket of a year may be shorter than seven days.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = i64::from(date.weekday().num_days_from_sunday());
    let jan1 = date.with_ordinal(1).unwrap_or(date);
    date.checked_sub_signed(Duration::days(back))
        .filter(|sunday| sunday.year() == date.year())
        .unwrap_or(jan1)
}

/// `YYYY-MM`
#[must_use]
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Parse a day key back into a date
#[must_use]
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}
