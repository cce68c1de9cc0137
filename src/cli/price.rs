//! CLI commands: `tokentally price ...` and `tokentally budget ...`

use super::{format_cost, format_number_with_commas, BudgetCommands, PriceCommands};
use crate::app::App;
use anyhow::Result;
use tokentally_core::{format_error_for_cli, BudgetLimits};
use tokentally_llm::{suggested_price, ModelPrice};

/// Dispatch a price subcommand.
pub async fn run_price(app: &App, cmd: PriceCommands) -> Result<()> {
    let ledger = app.service.ledger();
    match cmd {
        PriceCommands::Set {
            model,
            input,
            output,
        } => {
            if input < 0.0 || output < 0.0 {
                anyhow::bail!("Prices must not be negative");
            }
            ledger
                .set_price(&model, ModelPrice::new(input, output))
                .await
                .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
            println!("Set {model}: ${input:.2} in / ${output:.2} out per 1M tokens");
        }
        PriceCommands::List => {
            let prices = ledger.read(|s| s.model_prices.clone()).await;
            println!();
            println!("  {:<40} {:>12} {:>12}", "Model", "Input/1M", "Output/1M");
            println!("  {}", "-".repeat(66));
            if prices.is_empty() {
                println!("  (no prices configured)");
            }
            for (model, price) in &prices {
                println!(
                    "  {:<40} {:>12} {:>12}",
                    model,
                    format!("${:.2}", price.input_price_per_million),
                    format!("${:.2}", price.output_price_per_million),
                );
            }
            println!();
        }
        PriceCommands::Suggest { model, apply } => {
            let Some(price) = suggested_price(&model) else {
                println!("No known list price for {model}");
                return Ok(());
            };
            println!(
                "{model}: ${:.2} in / ${:.2} out per 1M tokens",
                price.input_price_per_million, price.output_price_per_million
            );
            if apply {
                ledger
                    .set_price(&model, price)
                    .await
                    .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
                println!("Saved.");
            }
        }
        PriceCommands::Remove { model } => {
            let removed = ledger
                .remove_price(&model)
                .await
                .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
            if removed {
                println!("Removed price for {model}");
            } else {
                println!("No price configured for {model}");
            }
        }
    }
    Ok(())
}

/// Dispatch a budget subcommand.
pub async fn run_budget(app: &App, cmd: BudgetCommands) -> Result<()> {
    let ledger = app.service.ledger();
    let current = ledger
        .read(|s| BudgetLimits {
            daily_token_warning: s.preferences.daily_token_warning,
            monthly_budget_usd: s.preferences.monthly_budget_usd,
        })
        .await;

    match cmd {
        BudgetCommands::Show => {
            let (today_tokens, month_cost) = app
                .service
                .query(|q| {
                    let keys = q.keys();
                    (q.today().total, q.month_cost(&keys.month))
                })
                .await;

            println!();
            println!("  {:<20} {:>16} {:>16}", "Check", "Current", "Limit");
            println!("  {}", "-".repeat(54));
            println!(
                "  {:<20} {:>16} {:>16}",
                "Daily tokens",
                format_number_with_commas(today_tokens),
                limit_label(current.daily_token_warning > 0, || {
                    format_number_with_commas(current.daily_token_warning)
                }),
            );
            println!(
                "  {:<20} {:>16} {:>16}",
                "Monthly cost",
                format!("${:.4}", month_cost),
                limit_label(current.monthly_budget_usd > 0.0, || {
                    format_cost(current.monthly_budget_usd)
                }),
            );
            println!();
        }
        BudgetCommands::Set {
            daily_tokens,
            monthly_usd,
        } => {
            if daily_tokens.is_none() && monthly_usd.is_none() {
                anyhow::bail!("Nothing to set: pass --daily-tokens and/or --monthly-usd");
            }
            if monthly_usd.is_some_and(|usd| usd < 0.0 || !usd.is_finite()) {
                anyhow::bail!("--monthly-usd must be a non-negative number");
            }
            let limits = BudgetLimits {
                daily_token_warning: daily_tokens.unwrap_or(current.daily_token_warning),
                monthly_budget_usd: monthly_usd.unwrap_or(current.monthly_budget_usd),
            };
            ledger
                .set_limits(limits)
                .await
                .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;
            println!("Budget updated.");
        }
    }
    Ok(())
}

fn limit_label(enabled: bool, label: impl FnOnce() -> String) -> String {
    if enabled {
        label()
    } else {
        "off".to_string()
    }
}
