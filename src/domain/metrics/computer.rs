//! Derives objective metrics and quality scores from a single response

use std::sync::Arc;

use super::data::MetricsData;
use super::pricing::PriceTable;
use super::scoring::{HeuristicScorer, QualityScorer, QualityScores};
use crate::domain::experiment::ModelConfig;
use crate::domain::llm::{TokenUsage, ESTIMATED_TOKENS, TOTAL_TOKENS};

/// Default characters-per-token ratio used when a provider reports no usage
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Approximate token count: one token per `chars_per_token` characters, rounded up.
///
/// This is an estimate, not a tokenizer; usage built from it carries the
/// `estimated_tokens` key and metrics built from it are flagged with
/// `token_count_estimated`.
pub fn estimate_tokens(char_count: u64, chars_per_token: f64) -> u64 {
    (char_count as f64 / chars_per_token).ceil() as u64
}

/// Ratios that are zero, negative or not finite fall back to the default
pub fn sanitize_chars_per_token(chars_per_token: f64) -> f64 {
    if chars_per_token > 0.0 && chars_per_token.is_finite() {
        chars_per_token
    } else {
        DEFAULT_CHARS_PER_TOKEN
    }
}

/// Pure metrics computation; never fails
#[derive(Debug, Clone)]
pub struct MetricsComputer {
    price_table: PriceTable,
    chars_per_token: f64,
    scorer: Option<Arc<dyn QualityScorer>>,
}

impl Default for MetricsComputer {
    fn default() -> Self {
        Self::new(PriceTable::default())
    }
}

impl MetricsComputer {
    /// Computer with heuristic scoring and the default token estimate
    pub fn new(price_table: PriceTable) -> Self {
        Self {
            price_table,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            scorer: Some(Arc::new(HeuristicScorer::new())),
        }
    }

    /// Override the characters-per-token approximation; non-positive values are ignored
    pub fn with_chars_per_token(mut self, chars_per_token: f64) -> Self {
        if chars_per_token > 0.0 && chars_per_token.is_finite() {
            self.chars_per_token = chars_per_token;
        }
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn QualityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Disable quality scoring; scores are then reported as absent
    pub fn without_scoring(mut self) -> Self {
        self.scorer = None;
        self
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    pub fn estimate_tokens(&self, char_count: u64) -> u64 {
        estimate_tokens(char_count, self.chars_per_token)
    }

    /// Usage with a total-token key; a usage without one gets the estimate
    /// for `text` added next to whatever provider keys it has
    pub fn complete_usage(&self, text: &str, usage: TokenUsage) -> TokenUsage {
        if usage.total().is_some() {
            return usage;
        }

        let estimate = self.estimate_tokens(text.chars().count() as u64);
        usage
            .with(ESTIMATED_TOKENS, estimate)
            .with(TOTAL_TOKENS, estimate)
    }

    pub fn compute(
        &self,
        text: &str,
        latency_ms: u64,
        config: &ModelConfig,
        token_usage: &TokenUsage,
    ) -> MetricsData {
        let response_length = text.chars().count() as u64;

        let (token_count, token_count_estimated) = match token_usage.total() {
            Some(total) => (total, token_usage.is_estimated()),
            None => (self.estimate_tokens(response_length), true),
        };

        let cost_estimate = self.price_table.cost(&config.model_name, token_count);

        let scores = match &self.scorer {
            Some(scorer) => scorer.score(text),
            None => QualityScores::default(),
        };

        MetricsData {
            response_length,
            token_count,
            token_count_estimated,
            latency_ms,
            cost_estimate,
            sentiment_score: scores.sentiment,
            readability_score: scores.readability,
            coherence_score: scores.coherence,
        }
    }
}
