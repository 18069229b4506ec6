//! Per-call response records

use serde::{Deserialize, Serialize};

use super::config::ModelConfig;
use super::request::PromptVariant;
use crate::domain::llm::TokenUsage;
use crate::domain::metrics::MetricsData;

/// Outcome of one call task.
///
/// Either `response` and `metrics` are both set, or `error` is set; never
/// both and never neither. Construct through [`ResponseRecord::success`],
/// [`ResponseRecord::demo`] or [`ResponseRecord::failure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    model_config: ModelConfig,
    run_number: u32,
    prompt_variant: PromptVariant,
    response: Option<String>,
    metrics: Option<MetricsData>,
    #[serde(default)]
    token_usage: TokenUsage,
    error: Option<String>,
    #[serde(default)]
    is_demo: bool,
}

impl ResponseRecord {
    /// A live provider response
    pub fn success(
        model_config: ModelConfig,
        run_number: u32,
        prompt_variant: PromptVariant,
        response: impl Into<String>,
        metrics: MetricsData,
        token_usage: TokenUsage,
    ) -> Self {
        Self {
            model_config,
            run_number,
            prompt_variant,
            response: Some(response.into()),
            metrics: Some(metrics),
            token_usage,
            error: None,
            is_demo: false,
        }
    }

    /// A synthetic response; counts as successful but is flagged
    pub fn demo(
        model_config: ModelConfig,
        run_number: u32,
        prompt_variant: PromptVariant,
        response: impl Into<String>,
        metrics: MetricsData,
        token_usage: TokenUsage,
    ) -> Self {
        Self {
            is_demo: true,
            ..Self::success(
                model_config,
                run_number,
                prompt_variant,
                response,
                metrics,
                token_usage,
            )
        }
    }

    pub fn failure(
        model_config: ModelConfig,
        run_number: u32,
        prompt_variant: PromptVariant,
        error: impl Into<String>,
    ) -> Self {
        Self {
            model_config,
            run_number,
            prompt_variant,
            response: None,
            metrics: None,
            token_usage: TokenUsage::new(),
            error: Some(error.into()),
            is_demo: false,
        }
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    pub fn run_number(&self) -> u32 {
        self.run_number
    }

    pub fn prompt_variant(&self) -> PromptVariant {
        self.prompt_variant
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn metrics(&self) -> Option<&MetricsData> {
        self.metrics.as_ref()
    }

    pub fn token_usage(&self) -> &TokenUsage {
        &self.token_usage
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_demo(&self) -> bool {
        self.is_demo
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the exactly-one-of invariant holds; relevant for records
    /// deserialized from storage
    pub fn is_well_formed(&self) -> bool {
        match (&self.response, &self.metrics, &self.error) {
            (Some(_), Some(_), None) => true,
            (None, None, Some(_)) => true,
            _ => false,
        }
    }
}
