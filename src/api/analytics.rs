//! Dashboard and export analytics endpoints

use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::experiment::{
    ExperimentQuery, ExperimentStatistics, ExportFile, ExportFormat, Provider,
};

/// Query parameters for exporting experiments
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExportQuery {
    pub format: Option<String>,
    #[serde(alias = "model_provider")]
    pub provider: Option<String>,
}

impl ExportQuery {
    fn parse(self) -> Result<(ExperimentQuery, ExportFormat), ApiError> {
        let format = self
            .format
            .map(|f| f.parse::<ExportFormat>())
            .transpose()
            .map_err(ApiError::bad_request)?
            .unwrap_or_default();

        let mut query = ExperimentQuery::new();
        if let Some(provider) = self.provider {
            let provider = provider.parse::<Provider>().map_err(ApiError::bad_request)?;
            query = query.with_provider(provider);
        }

        Ok((query, format))
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<ExperimentStatistics>, ApiError> {
    let statistics = state.experiment_service.statistics().await?;

    Ok(Json(statistics))
}

/// Experiment history as a downloadable CSV or JSON document
pub async fn export(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<Json<ExportFile>, ApiError> {
    let (query, format) = params.parse()?;
    debug!(format = %format, provider = ?query.provider, "Exporting experiments");

    let file = state.experiment_service.export(&query, format).await?;

    Ok(Json(file))
}
