//! CLI commands: `tokentally record | count | export | import | reset`

use crate::app::App;
use anyhow::{Context, Result};
use std::path::Path;
use tokentally_core::{format_error_for_cli, ImportDocument, ImportMode};

fn confirm(prompt: &str) -> bool {
    use std::io::{self, Write};
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        matches!(input.trim(), "y" | "Y" | "yes" | "YES")
    } else {
        false
    }
}

/// Record usage directly.
pub async fn record(
    app: &App,
    input: u64,
    output: u64,
    chat_id: Option<&str>,
    model_id: Option<&str>,
) -> Result<()> {
    let mut events = app.service.subscribe();
    app.service.record(input, output, chat_id, model_id).await;
    println!("Recorded {} input + {} output tokens", input, output);

    while let Ok(event) = events.try_recv() {
        if let tokentally_core::UsageEvent::BudgetWarning { warning } = event {
            println!("  warning: {warning}");
        }
    }
    Ok(())
}

/// Count tokens with the configured tokenizer.
pub async fn count(app: &App, text: &str) -> Result<()> {
    let tokens = app.service.count_tokens(text).await;
    println!("{tokens} tokens ({})", app.service.tokenizer_name());
    Ok(())
}

/// Write the export document to `path`.
pub async fn export(app: &App, path: &Path) -> Result<()> {
    let doc = app.service.ledger().export().await;
    let json = doc.to_json().map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "Exported {} days, {} prices, {} colors to {}",
        doc.usage.by_day.len(),
        doc.model_prices.len(),
        doc.model_colors.len(),
        path.display()
    );
    Ok(())
}

/// Read an export document from `path` and apply it.
pub async fn import(app: &App, path: &Path, mode: ImportMode) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = ImportDocument::parse(&text).map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;

    if mode == ImportMode::Replace
        && !confirm("Replace all recorded usage, prices and colors with this file?")
    {
        println!("Cancelled.");
        return Ok(());
    }

    let summary = app
        .service
        .ledger()
        .import(doc, mode)
        .await
        .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;

    println!(
        "Imported ({}) {} days, {} tokens, {} prices, {} colors",
        summary.mode, summary.days, summary.tokens, summary.prices, summary.colors
    );
    if summary.migrated > 0 {
        println!("  upgraded {} legacy day entries", summary.migrated);
    }
    Ok(())
}

/// Clear all recorded usage.
pub async fn reset(app: &App, force: bool) -> Result<()> {
    if !force && !confirm("Delete all recorded usage? Prices and colors are kept.") {
        println!("Cancelled.");
        return Ok(());
    }
    app.service
        .reset_all_usage()
        .await
        .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
    println!("Usage reset.");
    Ok(())
}
