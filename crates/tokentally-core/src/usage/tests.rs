//! Tests for the usage store

use super::*;
use chrono::NaiveDate;
use serde_json::json;

fn keys(y: i32, m: u32, d: u32, h: u32) -> PeriodKeys {
    PeriodKeys::at(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap())
}

#[test]
fn test_apply_touches_every_bucket() {
    let mut store = UsageStore::default();
    let k = keys(2026, 3, 7, 10);

    store.apply(&k, 100, 50, Some("chat1"), Some("gpt-4o"));
    store.apply(&k, 200, 75, Some("chat1"), Some("gpt-4o"));

    let expected = UsageBucket {
        input: 300,
        output: 125,
        total: 425,
        message_count: 2,
    };
    assert_eq!(store.by_model["gpt-4o"], expected);
    assert_eq!(store.by_chat["chat1"].total, 425);
    assert_eq!(store.all_time.total, 425);
    assert_eq!(store.by_day["2026-03-07"].bucket(), expected);
    assert_eq!(store.by_hour["2026-03-07T10"], expected);
    assert_eq!(store.by_week[&k.week], expected);
    assert_eq!(store.by_month["2026-03"], expected);
    assert_eq!(
        store.by_day["2026-03-07"].models["gpt-4o"],
        ModelBucket {
            input: 300,
            output: 125,
            total: 425
        }
    );
}

#[test]
fn test_missing_ids_skip_dimension_buckets() {
    let mut store = UsageStore::default();
    store.apply(&keys(2026, 3, 7, 10), 10, 5, None, None);

    assert!(store.by_chat.is_empty());
    assert!(store.by_model.is_empty());
    assert!(store.by_day["2026-03-07"].models.is_empty());
    assert_eq!(store.all_time.total, 15);
}

#[test]
fn test_totals_stay_consistent() {
    let mut store = UsageStore::default();
    let calls = [(5, 7), (0, 0), (1_000, 1), (33, 99)];
    for (i, (input, output)) in calls.iter().enumerate() {
        let day = 1 + i as u32;
        store.apply(&keys(2026, 1, day, 12), *input, *output, None, Some("m"));
    }

    let expected: u64 = calls.iter().map(|(i, o)| i + o).sum();
    assert_eq!(store.all_time.total, expected);
    assert_eq!(store.all_time.total, store.all_time.input + store.all_time.output);

    let model_sum: u64 = store.by_model.values().map(|b| b.total).sum();
    assert_eq!(model_sum, expected);

    let day_sum: u64 = store.by_day.values().map(|d| d.total).sum();
    assert_eq!(day_sum, expected);
    assert_eq!(store.all_time.message_count, calls.len() as u64);
}

#[test]
fn test_day_models_never_exceed_day_total() {
    let mut store = UsageStore::default();
    let k = keys(2026, 5, 1, 8);
    store.apply(&k, 10, 10, None, Some("a"));
    store.apply(&k, 10, 10, None, None);

    let day = &store.by_day["2026-05-01"];
    let model_total: u64 = day.models.values().map(|m| m.total).sum();
    assert!(model_total <= day.total);
    assert_eq!(day.message_count, 2);
}

#[test]
fn test_merge_adds_nested_models() {
    let mut left = UsageStore::default();
    let mut right = UsageStore::default();
    let k = keys(2026, 2, 2, 2);
    left.apply(&k, 1, 2, Some("c"), Some("m"));
    right.apply(&k, 10, 20, Some("c"), Some("m"));
    right.apply(&keys(2026, 2, 3, 2), 5, 5, None, Some("n"));

    left.merge(&right);

    assert_eq!(left.all_time.total, 43);
    assert_eq!(left.all_time.message_count, 3);
    assert_eq!(left.by_day["2026-02-02"].models["m"].total, 33);
    assert_eq!(left.by_day["2026-02-03"].models["n"].total, 10);
    assert_eq!(left.by_chat["c"].message_count, 2);
    assert_eq!(left.by_model["n"].total, 10);
}

#[test]
fn test_serde_uses_camel_case_and_defaults() {
    let mut store = UsageStore::default();
    store.apply(&keys(2026, 2, 2, 2), 1, 2, None, None);
    let value = serde_json::to_value(&store).unwrap();
    assert_eq!(value["allTime"]["messageCount"], 1);
    assert!(value["byDay"]["2026-02-02"].is_object());

    let empty: UsageStore = serde_json::from_value(json!({})).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_migrate_legacy_model_entries() {
    let mut usage = json!({
        "byDay": {
            "2025-06-01": {
                "input": 300, "output": 100, "total": 400, "messageCount": 3,
                "models": {
                    "old-model": 201,
                    "new-model": {"input": 150, "output": 49, "total": 199}
                }
            }
        }
    });

    let converted = migrate_usage_value(&mut usage);
    assert_eq!(converted, 1);

    let store: UsageStore = serde_json::from_value(usage).unwrap();
    let legacy = store.by_day["2025-06-01"].models["old-model"];
    assert_eq!(legacy.total, 201);
    assert!((legacy.input + legacy.output).abs_diff(legacy.total) <= 1);
    // 300 * 201 / 400 = 150.75 -> 151, 100 * 201 / 400 = 50.25 -> 50
    assert_eq!(legacy.input, 151);
    assert_eq!(legacy.output, 50);
    assert_eq!(store.by_day["2025-06-01"].models["new-model"].total, 199);
}

#[test]
fn test_migrate_is_idempotent_and_handles_zero_days() {
    let mut usage = json!({
        "byDay": {
            "2025-06-02": {"input": 0, "output": 0, "total": 0, "models": {"m": 12}}
        }
    });
    assert_eq!(migrate_usage_value(&mut usage), 1);
    assert_eq!(migrate_usage_value(&mut usage), 0);

    let store: UsageStore = serde_json::from_value(usage).unwrap();
    let entry = store.by_day["2025-06-02"].models["m"];
    assert_eq!((entry.input, entry.output, entry.total), (0, 0, 12));
}

#[test]
fn test_split_legacy_rounding_bound() {
    for legacy in [1u64, 7, 99, 1_001, 123_457] {
        let (input, output) = split_legacy(legacy, 333, 667, 1_000);
        assert!((input + output).abs_diff(legacy) <= 1, "legacy {legacy}");
    }
}

#[test]
fn test_week_start_clips_at_new_year() {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    // 2025-12-30 is a Tuesday; its bucket opens on Sunday the 28th
    assert_eq!(week_start(date(2025, 12, 30)), date(2025, 12, 28));
    assert_eq!(week_key(date(2025, 12, 28)), "2025-W53");
    assert_eq!(week_key(date(2025, 12, 27)), "2025-W52");

    // 2026 opens on a Thursday: week 1 is Jan 1-3
    assert_eq!(week_start(date(2026, 1, 2)), date(2026, 1, 1));
    assert_eq!(week_start(date(2026, 1, 4)), date(2026, 1, 4));
    assert_eq!(week_key(date(2026, 1, 3)), "2026-W01");
    assert_eq!(week_key(date(2026, 1, 4)), "2026-W02");
}
