//! Daily token warning and monthly budget checks
//!
//! Evaluated after every recording. Each check fires at 80% ("approaching")
//! and at or above 100% ("exceeded"). A limit of zero disables its check.
//! Warnings are notifications only; recording never fails because of them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fraction of a limit at which the approaching warning fires
pub const APPROACHING_RATIO: f64 = 0.8;

/// Which limit a warning concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCheck {
    /// Today's token total against the daily warning threshold
    DailyTokens,
    /// This month's cost against the monthly budget
    MonthlyCost,
}

/// Severity of a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    /// At least 80% of the limit
    Approaching,
    /// At or above the limit
    Exceeded,
}

/// One fired warning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWarning {
    /// Limit concerned
    pub check: BudgetCheck,
    /// Severity
    pub level: WarningLevel,
    /// Day or month key the warning applies to
    pub period: String,
    /// Current value (tokens or USD)
    pub current: f64,
    /// Configured limit (tokens or USD)
    pub limit: f64,
}

impl fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = if self.limit > 0.0 {
            self.current / self.limit * 100.0
        } else {
            0.0
        };
        match self.check {
            BudgetCheck::DailyTokens => write!(
                f,
                "daily tokens {:.0} of {:.0} ({:.0}%) on {}",
                self.current, self.limit, pct, self.period
            ),
            BudgetCheck::MonthlyCost => write!(
                f,
                "monthly cost ${:.4} of ${:.2} ({:.0}%) in {}",
                self.current, self.limit, pct, self.period
            ),
        }
    }
}

/// Configured limits
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetLimits {
    /// Daily token warning threshold (0 disables)
    pub daily_token_warning: u64,
    /// Monthly budget in USD (0 disables)
    pub monthly_budget_usd: f64,
}

/// Values the checks compare against
#[derive(Debug, Clone, Copy)]
pub struct BudgetReading<'a> {
    /// Today's day key
    pub day: &'a str,
    /// Today's token total
    pub day_tokens: u64,
    /// This month's key
    pub month: &'a str,
    /// This month's cost in USD
    pub month_cost: f64,
}

/// Level for `current` against `limit`, `None` when below 80% or disabled
#[must_use]
pub fn warning_level(current: f64, limit: f64) -> Option<WarningLevel> {
    if limit.is_nan() || limit <= 0.0 {
        return None;
    }
    if current >= limit {
        Some(WarningLevel::Exceeded)
    } else if current >= limit * APPROACHING_RATIO {
        Some(WarningLevel::Approaching)
    } else {
        None
    }
}

/// Tracks which warnings already fired so a stream of recordings notifies once
/// per level and period
#[derive(Debug, Default)]
pub struct BudgetMonitor {
    fired: HashMap<(BudgetCheck, String), WarningLevel>,
}

impl BudgetMonitor {
    /// Create an empty monitor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a reading against the limits, returning newly crossed levels
    pub fn evaluate(&mut self, limits: &BudgetLimits, reading: &BudgetReading<'_>) -> Vec<BudgetWarning> {
        let mut warnings = Vec::new();

        let daily_limit = limits.daily_token_warning as f64;
        if let Some(warning) = self.check(
            BudgetCheck::DailyTokens,
            reading.day,
            reading.day_tokens as f64,
            daily_limit,
        ) {
            warnings.push(warning);
        }

        if let Some(warning) = self.check(
            BudgetCheck::MonthlyCost,
            reading.month,
            reading.month_cost,
            limits.monthly_budget_usd,
        ) {
            warnings.push(warning);
        }

        warnings
    }

    /// Forget fired warnings (after a reset or import)
    pub fn clear(&mut self) {
        self.fired.clear();
    }

    fn check(
        &mut self,
        check: BudgetCheck,
        period: &str,
        current: f64,
        limit: f64,
    ) -> Option<BudgetWarning> {
        let level = warning_level(current, limit)?;
        let key = (check, period.to_string());
        if self.fired.get(&key).is_some_and(|fired| *fired >= level) {
            return None;
        }
        self.fired.insert(key, level);
        Some(BudgetWarning {
            check,
            level,
            period: period.to_string(),
            current,
            limit,
        })
    }
}
