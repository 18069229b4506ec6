//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::services::ExperimentService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub experiment_service: Arc<ExperimentService>,
}

impl AppState {
    pub fn new(experiment_service: Arc<ExperimentService>) -> Self {
        Self { experiment_service }
    }
}
