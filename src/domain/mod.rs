//! Domain layer - Core business logic and entities

pub mod demo;
pub mod error;
pub mod experiment;
pub mod llm;
pub mod metrics;

pub use demo::{DemoFallbackGenerator, DemoReason, DEMO_MARKER};
pub use error::DomainError;
pub use experiment::{
    CallTask, ExperimentId, ExperimentRequest, ExperimentResult, ExperimentStore, ModelConfig,
    PromptVariant, Provider, ResponseRecord,
};
pub use llm::{Completion, LlmProvider, ProviderError, ProviderErrorKind, TokenUsage};
pub use metrics::{MetricsComputer, MetricsData, PriceTable};
