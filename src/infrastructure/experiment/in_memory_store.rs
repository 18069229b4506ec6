//! In-memory experiment store

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::experiment::{
    validate_rating, ExperimentId, ExperimentQuery, ExperimentResult, ExperimentStatistics,
    ExperimentStore, StoredExperiment,
};
use crate::domain::DomainError;

pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Append-ordered store; the oldest experiments are evicted past `max_records`
#[derive(Debug)]
pub struct InMemoryExperimentStore {
    experiments: RwLock<VecDeque<StoredExperiment>>,
    max_records: usize,
}

impl InMemoryExperimentStore {
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    /// A limit of zero is raised to one
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            experiments: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    fn evict_if_needed(experiments: &mut VecDeque<StoredExperiment>, max_records: usize) {
        while experiments.len() > max_records {
            if let Some(evicted) = experiments.pop_front() {
                tracing::debug!(experiment_id = %evicted.id(), "Evicted experiment");
            }
        }
    }
}

impl Default for InMemoryExperimentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lock_error<E: std::fmt::Display>(e: E) -> DomainError {
    DomainError::internal(format!("Failed to acquire read lock: {}", e))
}

fn write_lock_error<E: std::fmt::Display>(e: E) -> DomainError {
    DomainError::internal(format!("Failed to acquire write lock: {}", e))
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn append(&self, result: &ExperimentResult) -> Result<(), DomainError> {
        let mut experiments = self.experiments.write().map_err(write_lock_error)?;

        if experiments.iter().any(|e| e.id() == result.id()) {
            return Err(DomainError::storage(format!(
                "Experiment '{}' already stored",
                result.id()
            )));
        }

        experiments.push_back(StoredExperiment::new(result.clone()));
        Self::evict_if_needed(&mut experiments, self.max_records);

        Ok(())
    }

    async fn get(&self, id: &ExperimentId) -> Result<Option<StoredExperiment>, DomainError> {
        let experiments = self.experiments.read().map_err(read_lock_error)?;

        Ok(experiments.iter().find(|e| e.id() == id).cloned())
    }

    async fn query(&self, query: &ExperimentQuery) -> Result<Vec<StoredExperiment>, DomainError> {
        let experiments = self.experiments.read().map_err(read_lock_error)?;

        Ok(query.apply(experiments.iter()))
    }

    async fn delete(&self, id: &ExperimentId) -> Result<bool, DomainError> {
        let mut experiments = self.experiments.write().map_err(write_lock_error)?;
        let before = experiments.len();

        experiments.retain(|e| e.id() != id);

        Ok(experiments.len() < before)
    }

    async fn update_rating(
        &self,
        id: &ExperimentId,
        rating: u8,
        notes: Option<String>,
    ) -> Result<StoredExperiment, DomainError> {
        validate_rating(rating)?;
        let mut experiments = self.experiments.write().map_err(write_lock_error)?;

        let experiment = experiments
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", id)))?;

        experiment.user_rating = Some(rating);
        experiment.notes = notes;

        Ok(experiment.clone())
    }

    async fn statistics(&self) -> Result<ExperimentStatistics, DomainError> {
        let experiments = self.experiments.read().map_err(read_lock_error)?;

        Ok(ExperimentStatistics::from_experiments(
            experiments.iter(),
            Utc::now(),
        ))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let experiments = self.experiments.read().map_err(read_lock_error)?;

        Ok(experiments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tokio_test::{assert_err, assert_ok};

    use crate::domain::experiment::{ModelConfig, PromptVariant, Provider, ResponseRecord};

    fn result(id: &str, provider: Provider, minutes_ago: i64) -> ExperimentResult {
        let timestamp = Utc::now() - Duration::minutes(minutes_ago);

        ExperimentResult::new(
            ExperimentId::new(id),
            "prompt",
            None,
            vec![ResponseRecord::failure(
                ModelConfig::new(provider, "model"),
                1,
                PromptVariant::A,
                "timeout",
            )],
            timestamp,
            timestamp,
        )
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = InMemoryExperimentStore::new();

        store.append(&result("exp-1", Provider::OpenAi, 0)).await.unwrap();

        let stored = store.get(&ExperimentId::new("exp-1")).await.unwrap().unwrap();
        assert_eq!(stored.id().as_str(), "exp-1");
        assert!(stored.user_rating.is_none());
        assert!(store.get(&ExperimentId::new("exp-2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_is_not_an_upsert() {
        let store = InMemoryExperimentStore::new();
        let experiment = result("exp-1", Provider::OpenAi, 0);

        assert_ok!(store.append(&experiment).await);

        assert_err!(store.append(&experiment).await);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_eviction_oldest_first() {
        let store = InMemoryExperimentStore::with_max_records(2);

        store.append(&result("exp-1", Provider::OpenAi, 3)).await.unwrap();
        store.append(&result("exp-2", Provider::OpenAi, 2)).await.unwrap();
        store.append(&result("exp-3", Provider::OpenAi, 1)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get(&ExperimentId::new("exp-1")).await.unwrap().is_none());
        assert!(store.get(&ExperimentId::new("exp-3")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_query_newest_first_with_filter() {
        let store = InMemoryExperimentStore::new();

        store.append(&result("exp-1", Provider::OpenAi, 10)).await.unwrap();
        store.append(&result("exp-2", Provider::Anthropic, 5)).await.unwrap();
        store.append(&result("exp-3", Provider::OpenAi, 1)).await.unwrap();

        let all = store.query(&ExperimentQuery::new()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["exp-3", "exp-2", "exp-1"]);

        let openai = store
            .query(&ExperimentQuery::new().with_provider(Provider::OpenAi).with_limit(1))
            .await
            .unwrap();
        assert_eq!(openai.len(), 1);
        assert_eq!(openai[0].id().as_str(), "exp-3");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryExperimentStore::new();
        store.append(&result("exp-1", Provider::OpenAi, 0)).await.unwrap();

        assert!(assert_ok!(store.delete(&ExperimentId::new("exp-1")).await));
        assert!(!assert_ok!(store.delete(&ExperimentId::new("exp-1")).await));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_rating() {
        let store = InMemoryExperimentStore::new();
        let id = ExperimentId::new("exp-1");
        store.append(&result("exp-1", Provider::OpenAi, 0)).await.unwrap();

        let rated = store
            .update_rating(&id, 5, Some("great answers".to_string()))
            .await
            .unwrap();
        assert_eq!(rated.user_rating, Some(5));
        assert_eq!(rated.notes.as_deref(), Some("great answers"));

        assert!(matches!(
            store.update_rating(&id, 0, None).await,
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            store.update_rating(&ExperimentId::new("missing"), 3, None).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_statistics() {
        let store = InMemoryExperimentStore::new();
        store.append(&result("exp-1", Provider::OpenAi, 0)).await.unwrap();
        store.append(&result("exp-2", Provider::Anthropic, 0)).await.unwrap();
        store
            .update_rating(&ExperimentId::new("exp-1"), 3, None)
            .await
            .unwrap();

        let stats = store.statistics().await.unwrap();

        assert_eq!(stats.total_experiments, 2);
        assert_eq!(stats.total_responses, 2);
        assert_eq!(stats.average_rating, Some(3.0));
        assert_eq!(stats.recent_activity, 2);
        assert_eq!(stats.overall_success_rate, 0.0);
    }
}
