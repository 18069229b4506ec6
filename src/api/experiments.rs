//! Experiment execution and history endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::experiment::{
    ExperimentId, ExperimentQuery, ExperimentRequest, Provider, StoredExperiment,
};
use crate::infrastructure::services::{AbOutcome, ExperimentOutcome};

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing experiments
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListExperimentsQuery {
    pub provider: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListExperimentsQuery {
    fn into_query(self) -> Result<ExperimentQuery, ApiError> {
        let provider = self
            .provider
            .map(|p| p.parse::<Provider>())
            .transpose()
            .map_err(ApiError::bad_request)?;

        Ok(ExperimentQuery {
            provider,
            from: self.from,
            to: self.to,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentListResponse {
    pub experiments: Vec<StoredExperiment>,
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn run_experiment(
    State(state): State<AppState>,
    Json(request): Json<ExperimentRequest>,
) -> Result<Json<ExperimentOutcome>, ApiError> {
    debug!(
        models = request.model_configs.len(),
        num_runs = request.num_runs,
        "Running experiment"
    );

    let outcome = state.experiment_service.run(request).await?;

    Ok(Json(outcome))
}

pub async fn run_ab_experiment(
    State(state): State<AppState>,
    Json(request): Json<ExperimentRequest>,
) -> Result<Json<AbOutcome>, ApiError> {
    debug!(models = request.model_configs.len(), "Running A/B experiment");

    let outcome = state.experiment_service.run_ab(request).await?;

    Ok(Json(outcome))
}

pub async fn list_experiments(
    State(state): State<AppState>,
    Query(params): Query<ListExperimentsQuery>,
) -> Result<Json<ExperimentListResponse>, ApiError> {
    let query = params.into_query()?;
    let experiments = state.experiment_service.list(&query).await?;

    Ok(Json(ExperimentListResponse {
        count: experiments.len(),
        experiments,
    }))
}

pub async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredExperiment>, ApiError> {
    let experiment = state
        .experiment_service
        .get(&ExperimentId::new(id))
        .await?;

    Ok(Json(experiment))
}

pub async fn delete_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .experiment_service
        .delete(&ExperimentId::new(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn rate_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<StoredExperiment>, ApiError> {
    let experiment = state
        .experiment_service
        .rate(&ExperimentId::new(id), request.rating, request.notes)
        .await?;

    Ok(Json(experiment))
}
