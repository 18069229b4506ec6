//! Merges per-call records into an experiment result

use chrono::{DateTime, Utc};

use crate::domain::experiment::{
    ExperimentId, ExperimentResult, PromptVariant, ResponseRecord,
};

/// What the aggregator needs to know about the originating request
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub prompt: String,
    /// Set when the request is one half of an A/B comparison
    pub prompt_variant: Option<PromptVariant>,
    pub received_at: DateTime<Utc>,
}

impl RequestMeta {
    pub fn new(prompt: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            prompt: prompt.into(),
            prompt_variant: None,
            received_at,
        }
    }

    pub fn with_variant(mut self, variant: PromptVariant) -> Self {
        self.prompt_variant = Some(variant);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExperimentAggregator;

impl ExperimentAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Assign an id and the completion timestamp, then summarize `responses`.
    ///
    /// `responses` must be in task order; the timestamp is never earlier than
    /// `meta.received_at`.
    pub fn aggregate(&self, meta: &RequestMeta, responses: Vec<ResponseRecord>) -> ExperimentResult {
        let timestamp = Utc::now().max(meta.received_at);

        ExperimentResult::new(
            ExperimentId::generate(),
            meta.prompt.clone(),
            meta.prompt_variant,
            responses,
            meta.received_at,
            timestamp,
        )
    }
}
