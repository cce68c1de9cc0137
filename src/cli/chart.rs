//! CLI command: `tokentally chart`
//!
//! Renders a gap-filled series as horizontal bars, oldest first.

use crate::app::App;
use anyhow::Result;
use tokentally_core::{ChartMetric, Granularity, SeriesPoint};

const BAR_WIDTH: usize = 48;

/// Parsed chart options
#[derive(Debug)]
pub struct ChartArgs {
    pub granularity: Option<Granularity>,
    pub window: Option<usize>,
    pub metric: Option<ChartMetric>,
    pub json: bool,
    pub save: bool,
}

/// Run the chart subcommand.
pub async fn run(app: &App, args: ChartArgs) -> Result<()> {
    let preferences = app.service.ledger().read(|s| s.preferences.clone()).await;
    let granularity = args.granularity.unwrap_or(preferences.chart_range);
    let metric = args.metric.unwrap_or(preferences.chart_metric);
    let window = args
        .window
        .unwrap_or_else(|| default_window(app, granularity))
        .max(1);

    if args.save {
        app.service
            .ledger()
            .set_chart_preferences(granularity, metric)
            .await?;
    }

    let series = app.service.series(granularity, window).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if metric == ChartMetric::Cost && granularity == Granularity::Hour {
        println!("  (hourly data has no per-model breakdown; showing tokens)");
    }
    let metric = effective_metric(metric, granularity);

    println!();
    println!("  {} {} per {}", window, metric_label(metric), granularity);
    println!("  {}", "-".repeat(72));
    for line in render(&series, metric) {
        println!("  {line}");
    }
    println!();
    Ok(())
}

fn default_window(app: &App, granularity: Granularity) -> usize {
    let charts = &app.config.charts;
    match granularity {
        Granularity::Hour => charts.hours,
        Granularity::Day => charts.days,
        Granularity::Week => charts.weeks,
        Granularity::Month => charts.months,
    }
}

fn effective_metric(metric: ChartMetric, granularity: Granularity) -> ChartMetric {
    if granularity == Granularity::Hour {
        ChartMetric::Tokens
    } else {
        metric
    }
}

fn metric_label(metric: ChartMetric) -> &'static str {
    match metric {
        ChartMetric::Tokens => "tokens",
        ChartMetric::Cost => "USD",
    }
}

fn value(point: &SeriesPoint, metric: ChartMetric) -> f64 {
    match metric {
        ChartMetric::Tokens => point.bucket.total as f64,
        ChartMetric::Cost => point.cost.unwrap_or(0.0),
    }
}

fn render(series: &[SeriesPoint], metric: ChartMetric) -> Vec<String> {
    let max = series
        .iter()
        .map(|p| value(p, metric))
        .fold(0.0_f64, f64::max);

    series
        .iter()
        .map(|point| {
            let v = value(point, metric);
            let len = if max > 0.0 {
                ((v / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let label = match metric {
                ChartMetric::Tokens => super::format_number_with_commas(point.bucket.total),
                ChartMetric::Cost => format!("${:.4}", v),
            };
            format!("{:<14} {:<width$} {}", point.key, "#".repeat(len), label, width = BAR_WIDTH)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokentally_core::UsageBucket;

    fn point(key: &str, total: u64, cost: Option<f64>) -> SeriesPoint {
        SeriesPoint {
            key: key.to_string(),
            bucket: UsageBucket {
                input: total,
                output: 0,
                total,
                message_count: 1,
            },
            cost,
        }
    }

    #[test]
    fn test_bars_scale_to_max() {
        let series = vec![
            point("2026-03-01", 0, Some(0.0)),
            point("2026-03-02", 50, Some(0.5)),
            point("2026-03-03", 100, Some(1.0)),
        ];
        let lines = render(&series, ChartMetric::Tokens);
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].contains('#'));
        assert_eq!(lines[1].matches('#').count(), BAR_WIDTH / 2);
        assert_eq!(lines[2].matches('#').count(), BAR_WIDTH);
        assert!(lines[2].ends_with("100"));
    }

    #[test]
    fn test_empty_series_has_no_bars() {
        let series = vec![point("2026-W01", 0, None)];
        let lines = render(&series, ChartMetric::Cost);
        assert!(!lines[0].contains('#'));
    }

    #[test]
    fn test_hourly_cost_falls_back_to_tokens() {
        assert_eq!(
            effective_metric(ChartMetric::Cost, Granularity::Hour),
            ChartMetric::Tokens
        );
        assert_eq!(
            effective_metric(ChartMetric::Cost, Granularity::Day),
            ChartMetric::Cost
        );
    }
}
