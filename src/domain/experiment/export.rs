//! Flat export of experiment history as CSV or JSON

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::ResponseRecord;
use super::repository::StoredExperiment;
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unsupported export format: '{}'", other)),
        }
    }
}

/// One response of one experiment, with its configuration and metrics
/// flattened into columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub experiment_id: String,
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub prompt_variant: String,
    pub model_provider: String,
    pub model_name: String,
    pub run_number: u32,
    pub response: Option<String>,
    pub error: Option<String>,
    pub is_demo: bool,
    pub config_temperature: f32,
    pub config_max_tokens: u32,
    pub config_top_p: f32,
    pub metric_response_length: Option<u64>,
    pub metric_token_count: Option<u64>,
    pub metric_latency_ms: Option<u64>,
    pub metric_cost_estimate: Option<f64>,
    pub metric_sentiment_score: Option<f64>,
    pub metric_readability_score: Option<f64>,
    pub metric_coherence_score: Option<f64>,
    pub user_rating: Option<u8>,
    pub notes: Option<String>,
}

const CSV_HEADER: [&str; 22] = [
    "experiment_id",
    "timestamp",
    "prompt",
    "prompt_variant",
    "model_provider",
    "model_name",
    "run_number",
    "response",
    "error",
    "is_demo",
    "config_temperature",
    "config_max_tokens",
    "config_top_p",
    "metric_response_length",
    "metric_token_count",
    "metric_latency_ms",
    "metric_cost_estimate",
    "metric_sentiment_score",
    "metric_readability_score",
    "metric_coherence_score",
    "user_rating",
    "notes",
];

impl ExportRow {
    fn new(experiment: &StoredExperiment, record: &ResponseRecord) -> Self {
        let result = &experiment.result;
        let config = record.model_config();
        let metrics = record.metrics();

        Self {
            experiment_id: result.id().to_string(),
            timestamp: result.timestamp(),
            prompt: result.prompt().to_string(),
            prompt_variant: record.prompt_variant().to_string(),
            model_provider: config.provider.to_string(),
            model_name: config.model_name.clone(),
            run_number: record.run_number(),
            response: record.response().map(str::to_string),
            error: record.error().map(str::to_string),
            is_demo: record.is_demo(),
            config_temperature: config.temperature,
            config_max_tokens: config.max_tokens,
            config_top_p: config.top_p,
            metric_response_length: metrics.map(|m| m.response_length),
            metric_token_count: metrics.map(|m| m.token_count),
            metric_latency_ms: metrics.map(|m| m.latency_ms),
            metric_cost_estimate: metrics.map(|m| m.cost_estimate),
            metric_sentiment_score: metrics.and_then(|m| m.sentiment_score),
            metric_readability_score: metrics.and_then(|m| m.readability_score),
            metric_coherence_score: metrics.and_then(|m| m.coherence_score),
            user_rating: experiment.user_rating,
            notes: experiment.notes.clone(),
        }
    }

    fn csv_fields(&self) -> [String; 22] {
        [
            self.experiment_id.clone(),
            self.timestamp.to_rfc3339(),
            self.prompt.clone(),
            self.prompt_variant.clone(),
            self.model_provider.clone(),
            self.model_name.clone(),
            self.run_number.to_string(),
            optional(&self.response),
            optional(&self.error),
            self.is_demo.to_string(),
            self.config_temperature.to_string(),
            self.config_max_tokens.to_string(),
            self.config_top_p.to_string(),
            optional(&self.metric_response_length),
            optional(&self.metric_token_count),
            optional(&self.metric_latency_ms),
            optional(&self.metric_cost_estimate),
            optional(&self.metric_sentiment_score),
            optional(&self.metric_readability_score),
            optional(&self.metric_coherence_score),
            optional(&self.user_rating),
            optional(&self.notes),
        ]
    }
}

fn optional<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Quote a field when it holds a delimiter, quote or line break
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| csv_escape(f.as_ref())).collect();
    escaped.join(",")
}

/// A rendered export, ready to hand to a client as a download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportFile {
    pub data: String,
    pub content_type: String,
    pub filename: String,
}

impl ExportFile {
    /// Render one row per response, in the order of `experiments`
    pub fn build(
        experiments: &[StoredExperiment],
        format: ExportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let rows: Vec<ExportRow> = experiments
            .iter()
            .flat_map(|experiment| {
                experiment
                    .result
                    .responses()
                    .iter()
                    .map(move |record| ExportRow::new(experiment, record))
            })
            .collect();

        let data = match format {
            ExportFormat::Csv => {
                let mut lines = Vec::with_capacity(rows.len() + 1);
                lines.push(csv_line(&CSV_HEADER));
                lines.extend(rows.iter().map(|row| csv_line(&row.csv_fields())));
                lines.join("\n") + "\n"
            }
            ExportFormat::Json => serde_json::to_string(&rows)
                .map_err(|e| DomainError::internal(format!("Failed to render export: {}", e)))?,
        };

        Ok(Self {
            data,
            content_type: format.content_type().to_string(),
            filename: format!(
                "experiments_{}.{}",
                generated_at.format("%Y%m%d_%H%M%S"),
                format.as_str()
            ),
        })
    }
}
