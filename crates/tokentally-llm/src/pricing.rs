//! Model Pricing - per-model cost information
//!
//! Prices are user-configured and default to zero, meaning "no estimate".
//! A small table of list prices is available on request but is never
//! applied implicitly.

use serde::{Deserialize, Serialize};

/// Price of one model (USD per 1M tokens)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPrice {
    /// Cost per 1M input tokens
    #[serde(default)]
    pub input_price_per_million: f64,
    /// Cost per 1M output tokens
    #[serde(default)]
    pub output_price_per_million: f64,
}

impl ModelPrice {
    /// Create a price
    #[must_use]
    pub const fn new(input_price_per_million: f64, output_price_per_million: f64) -> Self {
        Self {
            input_price_per_million,
            output_price_per_million,
        }
    }

    /// Whether this price produces no estimate
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.input_price_per_million == 0.0 && self.output_price_per_million == 0.0
    }

    /// Calculate cost for given token counts
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_price_per_million;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_price_per_million;
        input_cost + output_cost
    }
}

// Published list prices (per 1M tokens, USD)
const SUGGESTED_PRICES: &[(&str, ModelPrice)] = &[
    ("gpt-4o", ModelPrice::new(2.50, 10.00)),
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
    ("gpt-5", ModelPrice::new(1.25, 10.00)),
    ("gpt-5-nano", ModelPrice::new(0.05, 0.40)),
    ("claude-sonnet-4-5", ModelPrice::new(3.00, 15.00)),
    ("claude-haiku-4-5", ModelPrice::new(1.00, 5.00)),
    ("claude-opus-4-5", ModelPrice::new(5.00, 25.00)),
    ("gemini-2.5-flash", ModelPrice::new(0.075, 0.60)),
    ("gemini-2.5-pro", ModelPrice::new(1.25, 15.00)),
    ("deepseek-chat", ModelPrice::new(0.14, 0.28)),
    ("deepseek-reasoner", ModelPrice::new(0.55, 2.19)),
];

/// Look up a published list price
///
/// Exact names win; otherwise the longest known prefix is used so that
/// dated snapshots (`claude-sonnet-4-5-20250929`) resolve to their family.
#[must_use]
pub fn suggested_price(model: &str) -> Option<ModelPrice> {
    let model = model.to_ascii_lowercase();
    if let Some((_, price)) = SUGGESTED_PRICES.iter().find(|(name, _)| *name == model) {
        return Some(*price);
    }
    SUGGESTED_PRICES
        .iter()
        .filter(|(name, _)| model.starts_with(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, price)| *price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_price_calculation() {
        let price = ModelPrice::new(10.0, 20.0);

        let cost = price.calculate_cost(1_000_000, 1_000_000);
        assert!((cost - 30.0).abs() < 0.001);

        let cost = price.calculate_cost(1_000, 1_000);
        assert!((cost - 0.03).abs() < 0.001);
    }

    #[test]
    fn test_zero_price_is_always_free() {
        let price = ModelPrice::default();
        assert!(price.is_zero());
        assert_eq!(price.calculate_cost(u32::MAX as u64, u32::MAX as u64), 0.0);
    }

    #[test]
    fn test_suggested_price_lookup() {
        assert_eq!(suggested_price("gpt-4o"), Some(ModelPrice::new(2.50, 10.00)));
        // longest prefix: gpt-4o-mini, not gpt-4o
        assert_eq!(
            suggested_price("gpt-4o-mini-2024-07-18"),
            Some(ModelPrice::new(0.15, 0.60))
        );
        assert_eq!(
            suggested_price("Claude-Sonnet-4-5-20250929"),
            Some(ModelPrice::new(3.00, 15.00))
        );
        assert_eq!(suggested_price("my-local-llama"), None);
    }

    #[test]
    fn test_price_serde_camel_case() {
        let json = serde_json::to_value(ModelPrice::new(1.0, 2.0)).unwrap();
        assert_eq!(json["inputPricePerMillion"], 1.0);
        assert_eq!(json["outputPricePerMillion"], 2.0);

        let parsed: ModelPrice = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_zero());
    }
}
