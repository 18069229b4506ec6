//! Experiment store trait and query types

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::Provider;
use super::result::{ExperimentId, ExperimentResult};
use crate::domain::DomainError;

/// Window counted as recent activity in statistics
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// ============================================================================
// StoredExperiment
// ============================================================================

/// A persisted experiment with user feedback attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExperiment {
    #[serde(flatten)]
    pub result: ExperimentResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StoredExperiment {
    pub fn new(result: ExperimentResult) -> Self {
        Self {
            result,
            user_rating: None,
            notes: None,
        }
    }

    pub fn id(&self) -> &ExperimentId {
        self.result.id()
    }
}

/// Reject ratings outside 1..=5
pub fn validate_rating(rating: u8) -> Result<(), DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

// ============================================================================
// ExperimentQuery
// ============================================================================

/// Filters for listing experiments; results are newest first
#[derive(Debug, Clone, Default)]
pub struct ExperimentQuery {
    /// Only experiments with at least one response from this provider
    pub provider: Option<Provider>,
    /// Aggregation timestamp lower bound (inclusive)
    pub from: Option<DateTime<Utc>>,
    /// Aggregation timestamp upper bound (exclusive)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ExperimentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether an experiment passes the filters (ignores paging)
    pub fn matches(&self, experiment: &StoredExperiment) -> bool {
        let result = &experiment.result;

        if let Some(provider) = self.provider {
            if !result.uses_provider(provider) {
                return false;
            }
        }

        if let Some(from) = self.from {
            if result.timestamp() < from {
                return false;
            }
        }

        if let Some(to) = self.to {
            if result.timestamp() >= to {
                return false;
            }
        }

        true
    }

    /// Filter, sort newest first and page
    pub fn apply<'a, I>(&self, experiments: I) -> Vec<StoredExperiment>
    where
        I: IntoIterator<Item = &'a StoredExperiment>,
    {
        let mut results: Vec<_> = experiments
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();

        results.sort_by(|a, b| b.result.timestamp().cmp(&a.result.timestamp()));

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);

        results.into_iter().skip(offset).take(limit).collect()
    }
}

// ============================================================================
// ExperimentStatistics
// ============================================================================

/// Dashboard figures across all stored experiments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentStatistics {
    pub total_experiments: usize,
    pub total_responses: usize,
    /// Responses per provider
    pub provider_stats: BTreeMap<String, usize>,
    pub average_rating: Option<f64>,
    /// Experiments in the last seven days
    pub recent_activity: usize,
    /// Successful responses over all responses
    pub overall_success_rate: f64,
}

impl ExperimentStatistics {
    pub fn from_experiments<'a, I>(experiments: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a StoredExperiment>,
    {
        let recent_cutoff = now - Duration::days(RECENT_ACTIVITY_DAYS);
        let mut stats = Self::default();
        let mut successful = 0usize;
        let mut ratings: Vec<u8> = Vec::new();

        for experiment in experiments {
            let result = &experiment.result;
            stats.total_experiments += 1;

            if result.timestamp() >= recent_cutoff {
                stats.recent_activity += 1;
            }

            if let Some(rating) = experiment.user_rating {
                ratings.push(rating);
            }

            for response in result.responses() {
                stats.total_responses += 1;
                *stats
                    .provider_stats
                    .entry(response.model_config().provider.as_str().to_string())
                    .or_insert(0) += 1;

                if response.is_success() {
                    successful += 1;
                }
            }
        }

        if stats.total_responses > 0 {
            stats.overall_success_rate = successful as f64 / stats.total_responses as f64;
        }

        if !ratings.is_empty() {
            let sum: u32 = ratings.iter().map(|&r| r as u32).sum();
            stats.average_rating = Some(sum as f64 / ratings.len() as f64);
        }

        stats
    }
}

// ============================================================================
// ExperimentStore
// ============================================================================

/// Durable append-only log of finished experiments
#[async_trait]
pub trait ExperimentStore: Send + Sync + Debug {
    /// Persist a finished experiment
    async fn append(&self, result: &ExperimentResult) -> Result<(), DomainError>;

    async fn get(&self, id: &ExperimentId) -> Result<Option<StoredExperiment>, DomainError>;

    /// List experiments matching the query, newest first
    async fn query(&self, query: &ExperimentQuery) -> Result<Vec<StoredExperiment>, DomainError>;

    /// Returns false when the experiment did not exist
    async fn delete(&self, id: &ExperimentId) -> Result<bool, DomainError>;

    /// Attach a 1..=5 rating and optional notes
    async fn update_rating(
        &self,
        id: &ExperimentId,
        rating: u8,
        notes: Option<String>,
    ) -> Result<StoredExperiment, DomainError>;

    async fn statistics(&self) -> Result<ExperimentStatistics, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ModelConfig, PromptVariant, ResponseRecord};

    fn experiment(id: &str, provider: Provider, age_days: i64, success: bool) -> StoredExperiment {
        let timestamp = Utc::now() - Duration::days(age_days);
        let config = ModelConfig::new(provider, "model");
        let record = if success {
            ResponseRecord::success(
                config,
                1,
                PromptVariant::A,
                "ok",
                crate::domain::metrics::MetricsData {
                    response_length: 2,
                    token_count: 1,
                    token_count_estimated: true,
                    latency_ms: 10,
                    cost_estimate: 0.0,
                    sentiment_score: None,
                    readability_score: None,
                    coherence_score: None,
                },
                Default::default(),
            )
        } else {
            ResponseRecord::failure(config, 1, PromptVariant::A, "timeout")
        };

        StoredExperiment::new(ExperimentResult::new(
            ExperimentId::new(id),
            "p",
            None,
            vec![record],
            timestamp,
            timestamp,
        ))
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_query_newest_first_and_paging() {
        let experiments = vec![
            experiment("exp-old", Provider::OpenAi, 3, true),
            experiment("exp-new", Provider::OpenAi, 0, true),
            experiment("exp-mid", Provider::Anthropic, 1, true),
        ];

        let all = ExperimentQuery::new().apply(&experiments);
        let ids: Vec<_> = all.iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["exp-new", "exp-mid", "exp-old"]);

        let page = ExperimentQuery::new()
            .with_offset(1)
            .with_limit(1)
            .apply(&experiments);
        assert_eq!(page[0].id().as_str(), "exp-mid");
    }

    #[test]
    fn test_query_filters() {
        let experiments = vec![
            experiment("exp-a", Provider::OpenAi, 0, true),
            experiment("exp-b", Provider::Anthropic, 0, true),
            experiment("exp-c", Provider::OpenAi, 10, true),
        ];

        let openai = ExperimentQuery::new()
            .with_provider(Provider::OpenAi)
            .apply(&experiments);
        assert_eq!(openai.len(), 2);

        let recent = ExperimentQuery::new()
            .with_time_range(Utc::now() - Duration::days(1), Utc::now() + Duration::days(1))
            .apply(&experiments);
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_statistics() {
        let mut rated = experiment("exp-a", Provider::OpenAi, 0, true);
        rated.user_rating = Some(4);
        let mut rated_low = experiment("exp-b", Provider::Anthropic, 1, false);
        rated_low.user_rating = Some(2);
        let old = experiment("exp-c", Provider::OpenAi, 30, true);

        let stats = ExperimentStatistics::from_experiments(&[rated, rated_low, old], Utc::now());

        assert_eq!(stats.total_experiments, 3);
        assert_eq!(stats.total_responses, 3);
        assert_eq!(stats.provider_stats.get("openai"), Some(&2));
        assert_eq!(stats.provider_stats.get("anthropic"), Some(&1));
        assert_eq!(stats.average_rating, Some(3.0));
        assert_eq!(stats.recent_activity, 2);
        assert!((stats.overall_success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = ExperimentStatistics::from_experiments(&[], Utc::now());

        assert_eq!(stats, ExperimentStatistics::default());
    }

    #[test]
    fn test_stored_experiment_flattens_result() {
        let mut stored = experiment("exp-a", Provider::OpenAi, 0, true);
        stored.user_rating = Some(5);

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "exp-a");
        assert_eq!(json["user_rating"], 5);
        assert!(json.get("notes").is_none());

        let back: StoredExperiment = serde_json::from_value(json).unwrap();
        assert_eq!(back, stored);
    }
}
