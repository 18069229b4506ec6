//! Experiment service
//!
//! Validates requests, runs them through the scheduler, aggregates the
//! records and hands the result to the store. Persistence failures are
//! reported as warnings next to the result and never replace it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::aggregator::{ExperimentAggregator, RequestMeta};
use super::scheduler::RunScheduler;
use crate::domain::experiment::{
    validate_rating, ExperimentId, ExperimentQuery, ExperimentRequest, ExperimentResult,
    ExperimentStatistics, ExperimentStore, ExportFile, ExportFormat, PromptVariant,
    StoredExperiment,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_experiment, record_store_failure};

// ============================================================================
// Response Types
// ============================================================================

/// A finished experiment plus anything the caller should know about it
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOutcome {
    #[serde(flatten)]
    pub result: ExperimentResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Both halves of an A/B comparison, run and stored independently
#[derive(Debug, Clone, Serialize)]
pub struct AbOutcome {
    pub variant_a: ExperimentOutcome,
    pub variant_b: ExperimentOutcome,
}

// ============================================================================
// Experiment Service
// ============================================================================

/// Default bound on how long a run waits for the store
pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ExperimentService {
    scheduler: RunScheduler,
    aggregator: ExperimentAggregator,
    store: Arc<dyn ExperimentStore>,
    append_timeout: Duration,
}

impl ExperimentService {
    pub fn new(scheduler: RunScheduler, store: Arc<dyn ExperimentStore>) -> Self {
        Self {
            scheduler,
            aggregator: ExperimentAggregator::new(),
            store,
            append_timeout: DEFAULT_APPEND_TIMEOUT,
        }
    }

    /// Bound the wait for the store; a slower append keeps running in the background
    pub fn with_append_timeout(mut self, append_timeout: Duration) -> Self {
        self.append_timeout = append_timeout;
        self
    }

    pub fn scheduler(&self) -> &RunScheduler {
        &self.scheduler
    }

    /// Run `request.prompt` only; labelled A when A/B testing is enabled
    pub async fn run(&self, request: ExperimentRequest) -> Result<ExperimentOutcome, DomainError> {
        let received_at = Utc::now();
        request.validate()?;

        let variant = request.enable_ab_testing.then_some(PromptVariant::A);
        Ok(self.execute(&request, variant, received_at).await)
    }

    /// Run both prompts of an A/B request concurrently as two experiments
    pub async fn run_ab(&self, request: ExperimentRequest) -> Result<AbOutcome, DomainError> {
        let received_at = Utc::now();
        request.validate()?;

        let (request_a, request_b) = request.split_ab().ok_or_else(|| {
            DomainError::validation("A/B testing requires enable_ab_testing and a variant_prompt")
        })?;

        let (variant_a, variant_b) = tokio::join!(
            self.execute(&request_a, Some(PromptVariant::A), received_at),
            self.execute(&request_b, Some(PromptVariant::B), received_at)
        );

        Ok(AbOutcome {
            variant_a,
            variant_b,
        })
    }

    async fn execute(
        &self,
        request: &ExperimentRequest,
        variant: Option<PromptVariant>,
        received_at: chrono::DateTime<Utc>,
    ) -> ExperimentOutcome {
        let records = self
            .scheduler
            .schedule(request, variant.unwrap_or(PromptVariant::A))
            .await;

        let mut meta = RequestMeta::new(request.prompt.clone(), received_at);
        if let Some(variant) = variant {
            meta = meta.with_variant(variant);
        }

        let result = self.aggregator.aggregate(&meta, records);
        let metrics = result.metrics();

        record_experiment(metrics.total_responses, metrics.failed_responses);
        info!(
            experiment_id = %result.id(),
            responses = metrics.total_responses,
            success_rate = metrics.success_rate,
            demo_responses = metrics.demo_responses,
            duration_ms = result.duration_ms(),
            "Experiment completed"
        );

        let warnings = self.persist(&result).await.into_iter().collect();

        ExperimentOutcome { result, warnings }
    }

    /// Hand `result` to the store on its own task and wait at most
    /// `append_timeout` for it. Returns the warning to report, if any.
    async fn persist(&self, result: &ExperimentResult) -> Option<String> {
        let store = Arc::clone(&self.store);
        let experiment = result.clone();
        let append = tokio::spawn(async move {
            let outcome = store.append(&experiment).await;
            if let Err(e) = &outcome {
                warn!(
                    experiment_id = %experiment.id(),
                    error = %e,
                    "Failed to persist experiment"
                );
                record_store_failure("append");
            }
            outcome
        });

        match tokio::time::timeout(self.append_timeout, append).await {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(e))) => Some(format!("Experiment result was not saved: {}", e)),
            Ok(Err(e)) => {
                error!(experiment_id = %result.id(), error = %e, "Store task did not complete");
                record_store_failure("append");
                Some(format!("Experiment result was not saved: {}", e))
            }
            Err(_) => {
                warn!(
                    experiment_id = %result.id(),
                    timeout_ms = self.append_timeout.as_millis() as u64,
                    "Store is slow, answering before the experiment is saved"
                );
                record_store_failure("append_timeout");
                Some(format!(
                    "Experiment result was not saved within {} ms; it may appear in history later",
                    self.append_timeout.as_millis()
                ))
            }
        }
    }

    pub async fn get(&self, id: &ExperimentId) -> Result<StoredExperiment, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", id)))
    }

    pub async fn list(&self, query: &ExperimentQuery) -> Result<Vec<StoredExperiment>, DomainError> {
        self.store.query(query).await
    }

    pub async fn delete(&self, id: &ExperimentId) -> Result<(), DomainError> {
        if self.store.delete(id).await? {
            info!(experiment_id = %id, "Experiment deleted");
            Ok(())
        } else {
            Err(DomainError::not_found(format!("Experiment '{}' not found", id)))
        }
    }

    pub async fn rate(
        &self,
        id: &ExperimentId,
        rating: u8,
        notes: Option<String>,
    ) -> Result<StoredExperiment, DomainError> {
        validate_rating(rating)?;
        self.store.update_rating(id, rating, notes).await
    }

    pub async fn statistics(&self) -> Result<ExperimentStatistics, DomainError> {
        self.store.statistics().await
    }

    pub async fn count(&self) -> Result<usize, DomainError> {
        self.store.count().await
    }

    /// Render the experiments matching `query`, one row per response
    pub async fn export(
        &self,
        query: &ExperimentQuery,
        format: ExportFormat,
    ) -> Result<ExportFile, DomainError> {
        let experiments = self.store.query(query).await?;
        let file = ExportFile::build(&experiments, format, Utc::now())?;

        info!(
            experiments = experiments.len(),
            format = %format,
            "Experiments exported"
        );

        Ok(file)
    }
}
