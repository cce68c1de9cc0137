use super::*;
use crate::usage::PeriodKeys;
use chrono::NaiveDate;

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 30, 0)
        .unwrap()
}

fn sample_store() -> UsageStore {
    let mut usage = UsageStore::default();
    usage.apply(&PeriodKeys::at(at(2026, 3, 15, 14)), 100, 50, Some("chat-a"), Some("gpt-4o"));
    usage.apply(&PeriodKeys::at(at(2026, 3, 15, 9)), 200, 75, Some("chat-b"), Some("claude-3-5-sonnet"));
    usage.apply(&PeriodKeys::at(at(2026, 3, 10, 8)), 1_000, 0, Some("chat-a"), Some("gpt-4o"));
    usage.apply(&PeriodKeys::at(at(2026, 2, 27, 20)), 10, 10, None, None);
    usage
}

fn sample_prices() -> BTreeMap<String, ModelPrice> {
    let mut prices = BTreeMap::new();
    prices.insert("gpt-4o".to_string(), ModelPrice::new(2.5, 10.0));
    prices
}

#[test]
fn test_current_periods() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    assert_eq!(query.today().total, 425);
    assert_eq!(query.today().message_count, 2);
    assert_eq!(query.this_hour().total, 150);
    assert_eq!(query.this_month().total, 1_425);
    assert_eq!(query.all_time_cost(), 0.0);
}

#[test]
fn test_missing_keys_read_as_zero() {
    let usage = UsageStore::default();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    assert!(query.today().is_empty());
    assert!(query.this_week().is_empty());
    assert!(query.chat("nope").is_empty());
    assert!(query.model("nope").is_empty());
    assert_eq!(query.day_cost("2026-03-15"), 0.0);
}

#[test]
fn test_range_is_inclusive() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    let march = query.range("2026-03-10", "2026-03-15").unwrap();
    assert_eq!(march.total, 1_425);
    assert_eq!(march.message_count, 3);

    let single = query.range("2026-02-27", "2026-02-27").unwrap();
    assert_eq!(single.total, 20);

    let everything = query.range("2000-01-01", "2099-12-31").unwrap();
    assert_eq!(everything.total, usage.all_time.total);
}

#[test]
fn test_range_inverted_is_zero() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    assert!(query.range("2026-03-15", "2026-03-01").unwrap().is_empty());
}

#[test]
fn test_range_rejects_bad_keys() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    assert!(matches!(
        query.range("2026-3-1", "2026-03-15"),
        Err(Error::InvalidDayKey(key)) if key == "2026-3-1"
    ));
    assert!(query.range("2026-03-01", "2026-03").is_err());
}

#[test]
fn test_chat_usage() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    let chat = query.chat("chat-a");
    assert_eq!((chat.input, chat.output, chat.total), (1_100, 50, 1_150));
    assert_eq!(chat.message_count, 2);
}

#[test]
fn test_costs_use_configured_prices() {
    let usage = sample_store();
    let prices = sample_prices();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    // 1100 input at $2.5/M plus 50 output at $10/M
    let expected = 1_100.0 * 2.5 / 1e6 + 50.0 * 10.0 / 1e6;
    assert!((query.cost_for_model("gpt-4o") - expected).abs() < 1e-12);
    assert!((query.all_time_cost() - expected).abs() < 1e-12);
    assert_eq!(query.cost_for_model("claude-3-5-sonnet"), 0.0);

    let today = 100.0 * 2.5 / 1e6 + 50.0 * 10.0 / 1e6;
    assert!((query.day_cost("2026-03-15") - today).abs() < 1e-12);
    assert!((query.month_cost("2026-03") - expected).abs() < 1e-12);
    assert_eq!(query.month_cost("2026-02"), 0.0);
}

#[test]
fn test_model_breakdown_sorted_by_total() {
    let usage = sample_store();
    let prices = sample_prices();
    let mut colors = BTreeMap::new();
    colors.insert("gpt-4o".to_string(), "#336699".to_string());
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    let models = query.model_breakdown(&colors);
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].model, "gpt-4o");
    assert_eq!(models[0].usage.total, 1_150);
    assert_eq!(models[0].color.as_deref(), Some("#336699"));
    assert_eq!(models[1].model, "claude-3-5-sonnet");
    assert_eq!(models[1].color, None);
    assert_eq!(models[1].cost, 0.0);
}

#[test]
fn test_daily_series_gap_filled() {
    let usage = sample_store();
    let prices = sample_prices();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    let series = query.series(Granularity::Day, 7);
    assert_eq!(series.len(), 7);
    assert_eq!(series[0].key, "2026-03-09");
    assert_eq!(series[6].key, "2026-03-15");
    assert!(series[0].bucket.is_empty());
    assert_eq!(series[1].bucket.total, 1_000);
    assert_eq!(series[6].bucket.total, 425);
    assert!(series.iter().all(|p| p.cost.is_some()));
}

#[test]
fn test_daily_series_crosses_month_boundary() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 2, 10));

    let keys: Vec<String> = query.daily_series(4).into_iter().map(|p| p.key).collect();
    assert_eq!(keys, ["2026-02-27", "2026-02-28", "2026-03-01", "2026-03-02"]);
}

#[test]
fn test_hourly_series() {
    let usage = sample_store();
    let prices = BTreeMap::new();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 1));

    let series = query.series(Granularity::Hour, 3);
    let keys: Vec<&str> = series.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, ["2026-03-14T23", "2026-03-15T00", "2026-03-15T01"]);
    assert!(series.iter().all(|p| p.cost.is_none()));
}

#[test]
fn test_monthly_series() {
    let usage = sample_store();
    let prices = sample_prices();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 31, 12));

    let series = query.series(Granularity::Month, 3);
    let keys: Vec<&str> = series.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, ["2026-01", "2026-02", "2026-03"]);
    assert_eq!(series[1].bucket.total, 20);
    assert_eq!(series[2].bucket.total, 1_425);
}

#[test]
fn test_weekly_series_matches_week_buckets() {
    let usage = sample_store();
    let prices = sample_prices();
    let now = at(2026, 3, 15, 14);
    let query = UsageQuery::new(&usage, &prices, now);

    let series = query.series(Granularity::Week, 4);
    assert_eq!(series.len(), 4);
    let last = series.last().unwrap();
    assert_eq!(last.key, week_key(now.date()));
    assert_eq!(last.bucket, query.this_week());

    let series_total: u64 = series.iter().map(|p| p.bucket.total).sum();
    assert_eq!(series_total, usage.all_time.total);
}

#[test]
fn test_weekly_series_keeps_short_year_end_week() {
    let mut usage = UsageStore::default();
    usage.apply(&PeriodKeys::at(at(2025, 12, 30, 10)), 60, 40, None, Some("gpt-4o"));
    usage.apply(&PeriodKeys::at(at(2025, 12, 22, 10)), 5, 5, None, None);
    let prices = sample_prices();
    let query = UsageQuery::new(&usage, &prices, at(2026, 1, 2, 12));

    let series = query.weekly_series(3);
    let keys: Vec<&str> = series.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, ["2025-W52", "2025-W53", "2026-W01"]);
    assert_eq!(series[1].bucket.total, 100);
    assert_eq!(series[0].bucket.total, 10);

    let series_total: u64 = series.iter().map(|p| p.bucket.total).sum();
    assert_eq!(series_total, 110);
    assert!(series[1].cost.unwrap() > 0.0);
}

#[test]
fn test_snapshot_carries_raw_maps() {
    let usage = sample_store();
    let prices = sample_prices();
    let query = UsageQuery::new(&usage, &prices, at(2026, 3, 15, 14));

    let snapshot = query.snapshot("cl100k_base");
    assert_eq!(snapshot.tokenizer, "cl100k_base");
    assert_eq!(snapshot.all_time, usage.all_time);
    assert_eq!(snapshot.by_day.len(), 3);
    assert_eq!(snapshot.by_chat.len(), 2);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("thisHour").is_some());
    assert!(json.get("allTimeCost").is_some());
}

#[test]
fn test_granularity_parsing() {
    assert_eq!("daily".parse::<Granularity>().unwrap(), Granularity::Day);
    assert_eq!("Week".parse::<Granularity>().unwrap(), Granularity::Week);
    assert!("fortnight".parse::<Granularity>().is_err());
    assert_eq!(Granularity::default(), Granularity::Day);
}
