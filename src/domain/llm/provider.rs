use async_trait::async_trait;
use std::fmt::Debug;

use super::{Completion, ProviderError};
use crate::domain::experiment::ModelConfig;

/// Trait for LLM providers (OpenAI, Anthropic, Hugging Face)
///
/// Implementations read the config but never mutate it; credentials are
/// captured at construction time.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a single completion request and normalize the reply
    async fn complete(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<Completion, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::domain::llm::TokenUsage;

    type Outcome = Result<Completion, ProviderError>;

    /// Provider returning scripted outcomes in call order.
    ///
    /// Once the script is exhausted the last outcome repeats. Delays can be
    /// keyed by model name to simulate slow models.
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        outcomes: Mutex<Vec<Outcome>>,
        delays: Mutex<Vec<(String, Duration)>>,
        calls: AtomicUsize,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                outcomes: Mutex::new(Vec::new()),
                delays: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_response(self, text: impl Into<String>, total_tokens: u64) -> Self {
            let usage = TokenUsage::new()
                .with("completion_tokens", total_tokens)
                .with("total_tokens", total_tokens);
            self.with_outcome(Ok(Completion::new(text, usage)))
        }

        pub fn with_error(self, error: ProviderError) -> Self {
            self.with_outcome(Err(error))
        }

        pub fn with_outcome(self, outcome: Outcome) -> Self {
            self.outcomes.lock().unwrap().push(outcome);
            self
        }

        pub fn with_delay(self, model_name: impl Into<String>, delay: Duration) -> Self {
            self.delays.lock().unwrap().push((model_name.into(), delay));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_outcome(&self, call: usize) -> Outcome {
            let outcomes = self.outcomes.lock().unwrap();

            outcomes
                .get(call)
                .or_else(|| outcomes.last())
                .cloned()
                .unwrap_or_else(|| {
                    Err(ProviderError::invalid_request(
                        self.name,
                        "No mock response configured",
                    ))
                })
        }

        fn delay_for(&self, model_name: &str) -> Option<Duration> {
            self.delays
                .lock()
                .unwrap()
                .iter()
                .find(|(name, _)| name == model_name)
                .map(|(_, delay)| *delay)
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn complete(
            &self,
            _prompt: &str,
            config: &ModelConfig,
        ) -> Result<Completion, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self.next_outcome(call);

            if let Some(delay) = self.delay_for(&config.model_name) {
                tokio::time::sleep(delay).await;
            }

            outcome
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
