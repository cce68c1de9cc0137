//! Legacy usage data migration
//!
//! Older data stored a day's per-model entry as a bare token count. Such
//! entries are upgraded in place on the raw JSON value before typed decoding:
//! the day's aggregate input:output ratio splits the legacy count, and the
//! legacy value is kept as `total`. The split is an estimate; rounding can put
//! `input + output` one token away from `total`.

use serde_json::{json, Map, Value};
use tracing::debug;

/// Upgrade legacy numeric model entries; returns how many were converted
pub fn migrate_usage_value(usage: &mut Value) -> usize {
    let Some(by_day) = usage.get_mut("byDay").and_then(Value::as_object_mut) else {
        return 0;
    };

    let mut converted = 0;
    for (day_key, day) in by_day.iter_mut() {
        let Some(day) = day.as_object_mut() else {
            continue;
        };
        let day_input = number(day, "input");
        let day_output = number(day, "output");
        let day_total = number(day, "total");

        let Some(models) = day.get_mut("models").and_then(Value::as_object_mut) else {
            continue;
        };
        for (model, entry) in models.iter_mut() {
            let Some(legacy) = entry.as_f64() else {
                continue;
            };
            let legacy = if legacy.is_finite() && legacy > 0.0 {
                legacy.round() as u64
            } else {
                0
            };
            let (input, output) = split_legacy(legacy, day_input, day_output, day_total);
            debug!(day = %day_key, model = %model, legacy, input, output, "migrated legacy model entry");
            *entry = json!({ "input": input, "output": output, "total": legacy });
            converted += 1;
        }
    }
    converted
}

/// Split a legacy total by the day's input:output ratio
#[must_use]
pub fn split_legacy(legacy: u64, day_input: u64, day_output: u64, day_total: u64) -> (u64, u64) {
    if day_total == 0 {
        return (0, 0);
    }
    let share = legacy as f64 / day_total as f64;
    let input = (day_input as f64 * share).round() as u64;
    let output = (day_output as f64 * share).round() as u64;
    (input, output)
}

fn number(object: &Map<String, Value>, field: &str) -> u64 {
    object
        .get(field)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0)
}
