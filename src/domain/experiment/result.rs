//! Experiment results and aggregate metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::Provider;
use super::record::ResponseRecord;
use super::request::PromptVariant;
use crate::domain::metrics::MetricsData;

// ============================================================================
// ExperimentId
// ============================================================================

/// Unique identifier of a finished experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(String);

impl ExperimentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("exp-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExperimentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ExperimentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// AggregateMetrics
// ============================================================================

/// Summary over all responses of one experiment.
///
/// Averages and ranges only consider successful records (demo responses
/// included) and are `None` when there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_responses: usize,
    pub successful_responses: usize,
    pub failed_responses: usize,
    pub demo_responses: usize,
    pub success_rate: f64,

    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,

    pub avg_token_count: Option<f64>,
    pub min_token_count: Option<f64>,
    pub max_token_count: Option<f64>,

    pub avg_cost_estimate: Option<f64>,
    pub min_cost_estimate: Option<f64>,
    pub max_cost_estimate: Option<f64>,

    pub avg_response_length: Option<f64>,
    pub min_response_length: Option<f64>,
    pub max_response_length: Option<f64>,

    pub total_cost_estimate: f64,

    /// Index into `responses` of the lowest-latency successful record
    pub fastest_response: Option<usize>,
    /// Index into `responses` of the highest-latency successful record
    pub slowest_response: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Summary {
    avg: f64,
    min: f64,
    max: f64,
}

fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Summary {
        avg: sum / values.len() as f64,
        min,
        max,
    })
}

impl AggregateMetrics {
    pub fn from_records(records: &[ResponseRecord]) -> Self {
        let total = records.len();
        let successes: Vec<(usize, &ResponseRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_success())
            .collect();
        let demo = successes.iter().filter(|(_, r)| r.is_demo()).count();

        let metrics: Vec<(usize, &MetricsData)> = successes
            .iter()
            .filter_map(|(i, r)| r.metrics().map(|m| (*i, m)))
            .collect();

        let collect = |f: fn(&MetricsData) -> f64| -> Vec<f64> {
            metrics.iter().map(|(_, m)| f(m)).collect()
        };

        let latency = summarize(&collect(|m| m.latency_ms as f64));
        let tokens = summarize(&collect(|m| m.token_count as f64));
        let cost = summarize(&collect(|m| m.cost_estimate));
        let length = summarize(&collect(|m| m.response_length as f64));

        // ties resolve to the earliest index
        let mut fastest: Option<(usize, u64)> = None;
        let mut slowest: Option<(usize, u64)> = None;

        for (index, m) in &metrics {
            if fastest.is_none_or(|(_, best)| m.latency_ms < best) {
                fastest = Some((*index, m.latency_ms));
            }
            if slowest.is_none_or(|(_, worst)| m.latency_ms > worst) {
                slowest = Some((*index, m.latency_ms));
            }
        }

        let success_rate = if total == 0 {
            0.0
        } else {
            successes.len() as f64 / total as f64
        };

        Self {
            total_responses: total,
            successful_responses: successes.len(),
            failed_responses: total - successes.len(),
            demo_responses: demo,
            success_rate,
            avg_latency_ms: latency.map(|s| s.avg),
            min_latency_ms: latency.map(|s| s.min),
            max_latency_ms: latency.map(|s| s.max),
            avg_token_count: tokens.map(|s| s.avg),
            min_token_count: tokens.map(|s| s.min),
            max_token_count: tokens.map(|s| s.max),
            avg_cost_estimate: cost.map(|s| s.avg),
            min_cost_estimate: cost.map(|s| s.min),
            max_cost_estimate: cost.map(|s| s.max),
            avg_response_length: length.map(|s| s.avg),
            min_response_length: length.map(|s| s.min),
            max_response_length: length.map(|s| s.max),
            total_cost_estimate: metrics.iter().map(|(_, m)| m.cost_estimate).sum(),
            fastest_response: fastest.map(|(i, _)| i),
            slowest_response: slowest.map(|(i, _)| i),
        }
    }
}

// ============================================================================
// ExperimentResult
// ============================================================================

/// A finished experiment. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    id: ExperimentId,
    prompt: String,
    /// Set when the experiment is one half of an A/B comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_variant: Option<PromptVariant>,
    responses: Vec<ResponseRecord>,
    metrics: AggregateMetrics,
    received_at: DateTime<Utc>,
    /// Aggregation time
    timestamp: DateTime<Utc>,
    duration_ms: u64,
}

impl ExperimentResult {
    /// Build a result, computing aggregate metrics from `responses`.
    ///
    /// `responses` must already be in task order.
    pub fn new(
        id: ExperimentId,
        prompt: impl Into<String>,
        prompt_variant: Option<PromptVariant>,
        responses: Vec<ResponseRecord>,
        received_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metrics = AggregateMetrics::from_records(&responses);
        let duration_ms = (timestamp - received_at).num_milliseconds().max(0) as u64;

        Self {
            id,
            prompt: prompt.into(),
            prompt_variant,
            responses,
            metrics,
            received_at,
            timestamp,
            duration_ms,
        }
    }

    pub fn id(&self) -> &ExperimentId {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn prompt_variant(&self) -> Option<PromptVariant> {
        self.prompt_variant
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    pub fn metrics(&self) -> &AggregateMetrics {
        &self.metrics
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Whether any response used the given provider
    pub fn uses_provider(&self, provider: Provider) -> bool {
        self.responses
            .iter()
            .any(|r| r.model_config().provider == provider)
    }
}
