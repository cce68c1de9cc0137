//! CLI module for Tokentally
//!
//! Provides commands over the accounting engine:
//! - `stats`, `range`, `chat`, `models`: usage views
//! - `chart`: gap-filled series as terminal bars
//! - `record`, `count`: programmatic recording and token counting
//! - `price`, `budget`: prices and warning thresholds
//! - `export`, `import`, `reset`: data management

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokentally_core::{ChartMetric, Granularity, ImportMode};

pub mod chart;
pub mod data;
pub mod price;
pub mod stats;

/// Token usage and cost accounting
#[derive(Parser, Debug)]
#[command(name = "tokentally")]
#[command(about = "Token usage and cost accounting for chat generations")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Today, this hour/week/month and all-time usage
    Stats {
        /// Output the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Usage summed over an inclusive day range
    Range {
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day (YYYY-MM-DD)
        end: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Usage of one chat
    Chat {
        /// Chat id
        id: String,
    },
    /// Usage series as bars
    Chart {
        /// hourly | daily | weekly | monthly (default: saved preference)
        granularity: Option<Granularity>,
        /// Number of periods (default from config)
        #[arg(long)]
        window: Option<usize>,
        /// tokens | cost (default: saved preference)
        #[arg(long)]
        metric: Option<ChartMetric>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Remember granularity and metric as defaults
        #[arg(long)]
        save: bool,
    },
    /// Per-model usage and estimated cost
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record usage directly
    Record {
        /// Input tokens
        input: u64,
        /// Output tokens
        output: u64,
        /// Chat id
        #[arg(long)]
        chat: Option<String>,
        /// Model id
        #[arg(long)]
        model: Option<String>,
    },
    /// Count tokens with the configured tokenizer
    Count {
        /// Text to count
        text: String,
    },
    /// Manage model prices
    #[command(subcommand)]
    Price(PriceCommands),
    /// Manage warning thresholds
    #[command(subcommand)]
    Budget(BudgetCommands),
    /// Write usage, prices and colors to a JSON file
    Export {
        /// Output file
        path: PathBuf,
    },
    /// Read a JSON export
    Import {
        /// Input file
        path: PathBuf,
        /// merge | replace
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },
    /// Clear all recorded usage
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PriceCommands {
    /// Set a model's price in USD per million tokens
    Set {
        /// Model id
        model: String,
        /// Input price per million tokens
        input: f64,
        /// Output price per million tokens
        output: f64,
    },
    /// List configured prices
    List,
    /// Show the list price for a well-known model
    Suggest {
        /// Model id
        model: String,
        /// Save the suggestion as the model's price
        #[arg(long)]
        apply: bool,
    },
    /// Remove a model's price
    Remove {
        /// Model id
        model: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommands {
    /// Show thresholds and current standing
    Show,
    /// Set thresholds (0 disables)
    Set {
        /// Daily token warning
        #[arg(long)]
        daily_tokens: Option<u64>,
        /// Monthly budget in USD
        #[arg(long)]
        monthly_usd: Option<f64>,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let app = crate::app::App::load()?;
    match command {
        Commands::Stats { json } => stats::stats(&app, json).await,
        Commands::Range { start, end, json } => stats::range(&app, &start, &end, json).await,
        Commands::Chat { id } => stats::chat(&app, &id).await,
        Commands::Models { json } => stats::models(&app, json).await,
        Commands::Chart {
            granularity,
            window,
            metric,
            json,
            save,
        } => {
            chart::run(
                &app,
                chart::ChartArgs {
                    granularity,
                    window,
                    metric,
                    json,
                    save,
                },
            )
            .await
        }
        Commands::Record {
            input,
            output,
            chat,
            model,
        } => data::record(&app, input, output, chat.as_deref(), model.as_deref()).await,
        Commands::Count { text } => data::count(&app, &text).await,
        Commands::Price(cmd) => price::run_price(&app, cmd).await,
        Commands::Budget(cmd) => price::run_budget(&app, cmd).await,
        Commands::Export { path } => data::export(&app, &path).await,
        Commands::Import { path, mode } => data::import(&app, &path, mode).await,
        Commands::Reset { force } => data::reset(&app, force).await,
    }
}

// ── shared formatting ────────────────────────────────────────────────

pub(crate) fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub(crate) fn format_cost(usd: f64) -> String {
    if usd == 0.0 {
        "-".to_string()
    } else if usd < 0.01 {
        format!("${:.4}", usd)
    } else {
        format!("${:.2}", usd)
    }
}
