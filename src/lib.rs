//! Prompt Playground
//!
//! Experiment execution and metrics aggregation for comparing LLM providers:
//! - Concurrent fan-out of prompt runs over OpenAI, Anthropic and Hugging Face
//! - Deterministic demo responses when a provider cannot answer
//! - Per-response and aggregate metrics with cost estimates
//! - Experiment history with ratings and dashboard statistics

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::experiment::ExperimentStore;
use domain::metrics::{MetricsComputer, PriceTable};
use infrastructure::experiment::ExperimentStoreFactory;
use infrastructure::llm::{ProviderCredentials, ProviderRegistry};
use infrastructure::services::{CallLimiter, ExperimentService, RunScheduler, SchedulerSettings};
use tracing::info;

/// Create the application state with the configured store
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let store = ExperimentStoreFactory::create(&config.storage).await?;
    let service = create_experiment_service(config, store);

    Ok(AppState::new(Arc::new(service)))
}

/// Wire providers, scheduler and metrics around `store`
pub fn create_experiment_service(
    config: &AppConfig,
    store: Arc<dyn ExperimentStore>,
) -> ExperimentService {
    let credentials = ProviderCredentials::from_env();
    let registry = ProviderRegistry::from_config(
        &config.providers,
        &credentials,
        config.metrics.chars_per_token,
    );

    for provider in domain::experiment::Provider::ALL {
        info!(
            provider = %provider,
            configured = registry.is_configured(provider),
            "Provider registered"
        );
    }

    let mut computer = MetricsComputer::new(
        PriceTable::default().with_overrides(&config.metrics.pricing),
    )
    .with_chars_per_token(config.metrics.chars_per_token);

    if !config.metrics.quality_scoring {
        computer = computer.without_scoring();
    }

    let scheduler = RunScheduler::new(
        Arc::new(registry),
        CallLimiter::new(config.scheduler.max_concurrent_calls),
        Arc::new(computer),
    )
    .with_settings(SchedulerSettings {
        task_timeout: Duration::from_millis(config.scheduler.task_timeout_ms),
        demo_mode: config.providers.demo_mode,
    });

    ExperimentService::new(scheduler, store)
        .with_append_timeout(Duration::from_millis(config.storage.append_timeout_ms))
}
