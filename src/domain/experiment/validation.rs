//! Experiment request validation utilities

use thiserror::Error;

use super::config::ModelConfig;
use super::request::ExperimentRequest;

/// Maximum number of runs per model configuration
pub const MAX_RUNS: u32 = 10;

/// Maximum number of tokens a single call may request
pub const MAX_TOKENS_LIMIT: u32 = 4000;

/// Validation errors for experiment requests
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExperimentValidationError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("At least one model configuration is required")]
    NoModelConfigs,

    #[error("num_runs must be between 1 and {max}, got {got}")]
    InvalidRunCount { got: u32, max: u32 },

    #[error("Model name cannot be empty")]
    EmptyModelName,

    #[error("temperature must be between 0 and 2, got {0}")]
    InvalidTemperature(f32),

    #[error("max_tokens must be between 1 and {max}, got {got}")]
    InvalidMaxTokens { got: u32, max: u32 },

    #[error("top_p must be between 0 and 1, got {0}")]
    InvalidTopP(f32),

    #[error("{name} must be between -2 and 2, got {value}")]
    InvalidPenalty { name: &'static str, value: f32 },

    #[error("A/B testing requires a non-empty variant prompt")]
    EmptyVariantPrompt,
}

/// Validate the generation parameters of a single model configuration
pub fn validate_model_config(config: &ModelConfig) -> Result<(), ExperimentValidationError> {
    if config.model_name.trim().is_empty() {
        return Err(ExperimentValidationError::EmptyModelName);
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ExperimentValidationError::InvalidTemperature(
            config.temperature,
        ));
    }

    if config.max_tokens == 0 || config.max_tokens > MAX_TOKENS_LIMIT {
        return Err(ExperimentValidationError::InvalidMaxTokens {
            got: config.max_tokens,
            max: MAX_TOKENS_LIMIT,
        });
    }

    if !(0.0..=1.0).contains(&config.top_p) {
        return Err(ExperimentValidationError::InvalidTopP(config.top_p));
    }

    validate_penalty("frequency_penalty", config.frequency_penalty)?;
    validate_penalty("presence_penalty", config.presence_penalty)?;

    Ok(())
}

fn validate_penalty(name: &'static str, value: f32) -> Result<(), ExperimentValidationError> {
    if !(-2.0..=2.0).contains(&value) {
        return Err(ExperimentValidationError::InvalidPenalty { name, value });
    }

    Ok(())
}

/// Validate a whole experiment request before any task is scheduled
pub fn validate_request(request: &ExperimentRequest) -> Result<(), ExperimentValidationError> {
    if request.prompt.trim().is_empty() {
        return Err(ExperimentValidationError::EmptyPrompt);
    }

    if request.model_configs.is_empty() {
        return Err(ExperimentValidationError::NoModelConfigs);
    }

    if request.num_runs == 0 || request.num_runs > MAX_RUNS {
        return Err(ExperimentValidationError::InvalidRunCount {
            got: request.num_runs,
            max: MAX_RUNS,
        });
    }

    for config in &request.model_configs {
        validate_model_config(config)?;
    }

    if request.enable_ab_testing {
        if let Some(variant) = &request.variant_prompt {
            if variant.trim().is_empty() {
                return Err(ExperimentValidationError::EmptyVariantPrompt);
            }
        }
    }

    Ok(())
}
