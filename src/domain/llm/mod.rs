//! LLM provider domain models and traits

mod error;
mod provider;
mod response;

pub use error::{ProviderError, ProviderErrorKind};
pub use provider::LlmProvider;
pub use response::{Completion, TokenUsage, ESTIMATED_TOKENS, TOTAL_TOKENS};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
