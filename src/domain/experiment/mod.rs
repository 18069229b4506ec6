//! Experiment domain module
//!
//! An experiment runs one prompt against one or more model configurations,
//! optionally several times each, and summarizes the responses.

mod config;
mod export;
mod record;
mod repository;
mod request;
mod result;
mod task;
mod validation;

pub use config::{ModelConfig, Provider};
pub use export::{ExportFile, ExportFormat, ExportRow};
pub use record::ResponseRecord;
pub use repository::{
    validate_rating, ExperimentQuery, ExperimentStatistics, ExperimentStore, StoredExperiment,
    MAX_RATING, MIN_RATING, RECENT_ACTIVITY_DAYS,
};
pub use request::{ExperimentRequest, PromptVariant};
pub use result::{AggregateMetrics, ExperimentId, ExperimentResult};
pub use task::CallTask;
pub use validation::{
    validate_model_config, validate_request, ExperimentValidationError, MAX_RUNS,
    MAX_TOKENS_LIMIT,
};

#[cfg(test)]
pub use repository::mock::MockExperimentStore;
