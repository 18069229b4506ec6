//! Experiment requests and A/B prompt variants

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::ModelConfig;
use super::validation::{validate_request, ExperimentValidationError};

/// Label of the prompt an experiment ran with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptVariant {
    A,
    B,
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// A request to run one prompt against one or more model configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    pub prompt: String,
    pub model_configs: Vec<ModelConfig>,
    #[serde(default = "default_num_runs")]
    pub num_runs: u32,
    #[serde(default)]
    pub enable_ab_testing: bool,
    /// Second prompt compared against `prompt` when A/B testing is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_prompt: Option<String>,
}

fn default_num_runs() -> u32 {
    1
}

impl ExperimentRequest {
    pub fn new(prompt: impl Into<String>, model_configs: Vec<ModelConfig>) -> Self {
        Self {
            prompt: prompt.into(),
            model_configs,
            num_runs: default_num_runs(),
            enable_ab_testing: false,
            variant_prompt: None,
        }
    }

    pub fn with_num_runs(mut self, num_runs: u32) -> Self {
        self.num_runs = num_runs;
        self
    }

    pub fn with_variant_prompt(mut self, variant_prompt: impl Into<String>) -> Self {
        self.enable_ab_testing = true;
        self.variant_prompt = Some(variant_prompt.into());
        self
    }

    pub fn validate(&self) -> Result<(), ExperimentValidationError> {
        validate_request(self)
    }

    /// Number of call tasks this request expands into
    pub fn total_tasks(&self) -> usize {
        self.model_configs.len() * self.num_runs as usize
    }

    /// Split an A/B request into two independent single-prompt requests.
    ///
    /// Returns `None` unless A/B testing is enabled and a variant prompt is set.
    /// The two halves share model configurations and run counts; they are run
    /// and persisted as unrelated experiments.
    pub fn split_ab(&self) -> Option<(ExperimentRequest, ExperimentRequest)> {
        if !self.enable_ab_testing {
            return None;
        }

        let variant = self.variant_prompt.clone()?;

        let variant_a = Self {
            variant_prompt: None,
            ..self.clone()
        };

        let variant_b = Self {
            prompt: variant,
            variant_prompt: None,
            ..self.clone()
        };

        Some((variant_a, variant_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Provider;

    #[test]
    fn test_request_deserialize_defaults() {
        let json = r#"{
            "prompt": "Say hello",
            "model_configs": [{"provider": "openai", "model_name": "gpt-3.5-turbo", "temperature": 0.7, "max_tokens": 50}]
        }"#;

        let request: ExperimentRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.num_runs, 1);
        assert!(!request.enable_ab_testing);
        assert!(request.variant_prompt.is_none());
        assert_eq!(request.model_configs[0].max_tokens, 50);
    }

    #[test]
    fn test_total_tasks() {
        let request = ExperimentRequest::new(
            "p",
            vec![
                ModelConfig::new(Provider::OpenAi, "gpt-4"),
                ModelConfig::new(Provider::Anthropic, "claude-3-opus"),
            ],
        )
        .with_num_runs(3);

        assert_eq!(request.total_tasks(), 6);
    }

    #[test]
    fn test_split_ab() {
        let request = ExperimentRequest::new(
            "Explain recursion",
            vec![ModelConfig::new(Provider::OpenAi, "gpt-4")],
        )
        .with_num_runs(2)
        .with_variant_prompt("Explain recursion to a child");

        let (a, b) = request.split_ab().unwrap();

        assert_eq!(a.prompt, "Explain recursion");
        assert_eq!(b.prompt, "Explain recursion to a child");
        assert_eq!(a.num_runs, 2);
        assert_eq!(b.model_configs, a.model_configs);
        assert!(a.variant_prompt.is_none());
        assert!(b.variant_prompt.is_none());
    }

    #[test]
    fn test_split_ab_requires_flag_and_variant() {
        let mut request =
            ExperimentRequest::new("p", vec![ModelConfig::new(Provider::OpenAi, "gpt-4")]);
        assert!(request.split_ab().is_none());

        request.variant_prompt = Some("q".to_string());
        assert!(request.split_ab().is_none());

        request.enable_ab_testing = true;
        assert!(request.split_ab().is_some());
    }
}
