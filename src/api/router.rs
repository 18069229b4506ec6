use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::analytics;
use super::experiments;
use super::health;
use super::state::AppState;
use crate::config::ServerConfig;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
pub fn create_router(
    state: AppState,
    server: &ServerConfig,
    metrics: Option<PrometheusMetrics>,
) -> Router {
    let api = Router::new()
        .route("/experiments", get(experiments::list_experiments))
        .route("/experiments/run", post(experiments::run_experiment))
        .route("/experiments/ab", post(experiments::run_ab_experiment))
        .route(
            "/experiments/{id}",
            get(experiments::get_experiment).delete(experiments::delete_experiment),
        )
        .route("/experiments/{id}/rating", put(experiments::rate_experiment))
        .route("/analytics/dashboard", get(analytics::dashboard))
        .route("/analytics/export", get(analytics::export));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/api", api)
        .with_state(state);

    if let Some(metrics) = metrics {
        router = router.merge(create_metrics_router(metrics));
    }

    router
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}
