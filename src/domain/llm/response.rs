use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key every normalized usage mapping carries when the provider reports usage
pub const TOTAL_TOKENS: &str = "total_tokens";

/// Present when the token figures were estimated rather than reported
pub const ESTIMATED_TOKENS: &str = "estimated_tokens";

/// Token usage mapping, normalized across providers.
///
/// Always keyed by `total_tokens` when usage is known; provider specific keys
/// (`prompt_tokens`, `input_tokens`, ...) are kept alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenUsage(BTreeMap<String, u64>);

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage with explicit input/output counts under provider specific names
    pub fn from_counts(input_key: &str, input: u64, output_key: &str, output: u64) -> Self {
        Self::new()
            .with(input_key, input)
            .with(output_key, output)
            .with(TOTAL_TOKENS, input + output)
    }

    /// Usage derived from an approximation instead of provider accounting
    pub fn estimated(total: u64) -> Self {
        Self::new()
            .with(ESTIMATED_TOKENS, total)
            .with(TOTAL_TOKENS, total)
    }

    pub fn with(mut self, key: impl Into<String>, value: u64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn total(&self) -> Option<u64> {
        self.get(TOTAL_TOKENS)
    }

    pub fn is_estimated(&self) -> bool {
        self.0.contains_key(ESTIMATED_TOKENS)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A provider completion normalized into the common shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub token_usage: TokenUsage,
}

impl Completion {
    pub fn new(text: impl Into<String>, token_usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            token_usage,
        }
    }
}
