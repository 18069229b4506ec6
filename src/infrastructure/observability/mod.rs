//! Prometheus metrics for provider calls, experiments and storage

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_experiment, record_provider_call,
    record_store_failure, CallOutcome, PrometheusMetrics,
};
