//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ObservabilityConfig;

/// How a single provider call ended, as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// Answered by the demo generator, forced or after a fallback-eligible failure
    Demo,
    Error,
    Timeout,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Demo => "demo",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &ObservabilityConfig) -> Option<PrometheusMetrics> {
    if !config.metrics_enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("prompt_playground_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at /metrics");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_provider_call(provider: &str, outcome: CallOutcome, duration: Duration) {
    let provider = provider.to_string();

    counter!(
        "provider_calls_total",
        "provider" => provider.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!("provider_call_duration_seconds", "provider" => provider)
        .record(duration.as_secs_f64());
}

pub fn record_experiment(total_responses: usize, failed_responses: usize) {
    counter!("experiments_total").increment(1);
    counter!("experiment_responses_total").increment(total_responses as u64);

    if failed_responses > 0 {
        counter!("experiment_failed_responses_total").increment(failed_responses as u64);
    }
}

pub fn record_store_failure(operation: &'static str) {
    counter!("experiment_store_failures_total", "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CallOutcome::Success.as_str(), "success");
        assert_eq!(CallOutcome::Demo.as_str(), "demo");
        assert_eq!(CallOutcome::Error.as_str(), "error");
        assert_eq!(CallOutcome::Timeout.as_str(), "timeout");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_provider_call("openai", CallOutcome::Success, Duration::from_millis(5));
        record_experiment(2, 1);
        record_store_failure("append");
    }

    #[test]
    fn test_disabled_metrics() {
        let config = ObservabilityConfig {
            metrics_enabled: false,
        };

        assert!(init_metrics(&config).is_none());
    }
}
