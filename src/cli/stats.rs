//! CLI commands: `tokentally stats | range | chat | models`

use super::{format_cost, format_number_with_commas};
use crate::app::App;
use anyhow::Result;
use tokentally_core::{format_error_for_cli, UsageBucket};

/// Current periods and all-time totals.
pub async fn stats(app: &App, json: bool) -> Result<()> {
    let snapshot = app.service.stats().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let (today_cost, month_cost) = app
        .service
        .query(|q| {
            let keys = q.keys();
            (q.day_cost(&keys.day), q.month_cost(&keys.month))
        })
        .await;

    println!();
    println!("  Token Usage  (tokenizer: {})", snapshot.tokenizer);
    print_header();
    print_row("Today", &snapshot.today, Some(today_cost));
    print_row("This hour", &snapshot.this_hour, None);
    print_row("This week", &snapshot.this_week, None);
    print_row("This month", &snapshot.this_month, Some(month_cost));
    print_row("All time", &snapshot.all_time, Some(snapshot.all_time_cost));
    println!("  {}", "-".repeat(72));
    println!(
        "  {} days, {} chats, {} models tracked",
        snapshot.by_day.len(),
        snapshot.by_chat.len(),
        snapshot.by_model.len()
    );
    println!();
    Ok(())
}

/// Inclusive day range.
pub async fn range(app: &App, start: &str, end: &str, json: bool) -> Result<()> {
    let bucket = match app.service.usage_for_range(start, end).await {
        Ok(bucket) => bucket,
        Err(e) => anyhow::bail!(format_error_for_cli(&e)),
    };

    if json {
        let output = serde_json::json!({
            "start": start,
            "end": end,
            "usage": bucket,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    print_header();
    print_row(&format!("{start}..{end}"), &bucket, None);
    println!();
    Ok(())
}

/// One chat.
pub async fn chat(app: &App, chat_id: &str) -> Result<()> {
    let bucket = app.service.chat_usage(chat_id).await;
    println!();
    print_header();
    print_row(chat_id, &bucket, None);
    if bucket.is_empty() {
        println!("  (no usage recorded for this chat)");
    }
    println!();
    Ok(())
}

/// Per-model breakdown.
pub async fn models(app: &App, json: bool) -> Result<()> {
    let models = app.service.model_breakdown().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    println!();
    println!(
        "  {:<32} {:>14} {:>14} {:>10} {:>10}",
        "Model", "Input", "Output", "Cost", "Color"
    );
    println!("  {}", "-".repeat(84));
    if models.is_empty() {
        println!("  (no models recorded yet)");
    }
    for model in &models {
        println!(
            "  {:<32} {:>14} {:>14} {:>10} {:>10}",
            model.model,
            format_number_with_commas(model.usage.input),
            format_number_with_commas(model.usage.output),
            format_cost(model.cost),
            model.color.as_deref().unwrap_or("-"),
        );
    }
    println!();
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────

fn print_header() {
    println!("  {}", "-".repeat(72));
    println!(
        "  {:<22} {:>12} {:>12} {:>12} {:>10}",
        "Period", "Input", "Output", "Total", "Cost"
    );
    println!("  {}", "-".repeat(72));
}

fn print_row(label: &str, bucket: &UsageBucket, cost: Option<f64>) {
    println!(
        "  {:<22} {:>12} {:>12} {:>12} {:>10}",
        label,
        format_number_with_commas(bucket.input),
        format_number_with_commas(bucket.output),
        format_number_with_commas(bucket.total),
        cost.map(format_cost).unwrap_or_default(),
    );
}
