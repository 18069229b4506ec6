//! Call tasks: one provider call per (model config, run, prompt variant)

use std::sync::Arc;

use super::config::ModelConfig;
use super::request::PromptVariant;

/// One independent provider call scheduled for an experiment.
///
/// `slot` is the position of the task's result in the experiment output and is
/// fixed at expansion time.
#[derive(Debug, Clone)]
pub struct CallTask {
    pub slot: usize,
    pub model_config: Arc<ModelConfig>,
    pub run_number: u32,
    pub prompt_variant: PromptVariant,
}

impl CallTask {
    /// Expand model configs × runs into tasks, outer loop over configs and
    /// inner loop over run numbers (1-based).
    pub fn expand(
        model_configs: &[ModelConfig],
        num_runs: u32,
        prompt_variant: PromptVariant,
    ) -> Vec<CallTask> {
        let mut tasks = Vec::with_capacity(model_configs.len() * num_runs as usize);

        for config in model_configs {
            let shared = Arc::new(config.clone());

            for run_number in 1..=num_runs {
                tasks.push(CallTask {
                    slot: tasks.len(),
                    model_config: Arc::clone(&shared),
                    run_number,
                    prompt_variant,
                });
            }
        }

        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Provider;

    #[test]
    fn test_expand_order() {
        let configs = vec![
            ModelConfig::new(Provider::OpenAi, "gpt-4"),
            ModelConfig::new(Provider::Anthropic, "claude-3-opus"),
        ];

        let tasks = CallTask::expand(&configs, 3, PromptVariant::A);

        assert_eq!(tasks.len(), 6);

        let identity: Vec<_> = tasks
            .iter()
            .map(|t| (t.slot, t.model_config.model_name.as_str(), t.run_number))
            .collect();

        assert_eq!(
            identity,
            vec![
                (0, "gpt-4", 1),
                (1, "gpt-4", 2),
                (2, "gpt-4", 3),
                (3, "claude-3-opus", 1),
                (4, "claude-3-opus", 2),
                (5, "claude-3-opus", 3),
            ]
        );
    }

    #[test]
    fn test_expand_shares_config() {
        let configs = vec![ModelConfig::new(Provider::OpenAi, "gpt-4")];
        let tasks = CallTask::expand(&configs, 2, PromptVariant::B);

        assert!(Arc::ptr_eq(&tasks[0].model_config, &tasks[1].model_config));
        assert!(tasks.iter().all(|t| t.prompt_variant == PromptVariant::B));
    }
}
