//! Per-model price table used for cost estimates

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Price per 1K tokens in USD, keyed by model name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    rates_per_1k: HashMap<String, f64>,
}

impl PriceTable {
    /// An empty table; every model costs nothing
    pub fn empty() -> Self {
        Self {
            rates_per_1k: HashMap::new(),
        }
    }

    /// Set the rate for a model
    pub fn with_rate(mut self, model_name: impl Into<String>, usd_per_1k: f64) -> Self {
        self.rates_per_1k.insert(model_name.into(), usd_per_1k);
        self
    }

    /// Merge overrides on top of this table
    pub fn with_overrides(mut self, overrides: &HashMap<String, f64>) -> Self {
        for (model, rate) in overrides {
            self.rates_per_1k.insert(model.clone(), *rate);
        }
        self
    }

    pub fn rate(&self, model_name: &str) -> Option<f64> {
        self.rates_per_1k.get(model_name).copied()
    }

    /// Cost of `tokens` for a model; unknown models cost 0
    pub fn cost(&self, model_name: &str, tokens: u64) -> f64 {
        match self.rate(model_name) {
            Some(rate) => (tokens as f64 / 1000.0) * rate,
            None => 0.0,
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::empty()
            .with_rate("gpt-4", 0.03)
            .with_rate("gpt-3.5-turbo", 0.002)
            .with_rate("claude-3-opus", 0.015)
            .with_rate("claude-3-sonnet", 0.003)
    }
}
