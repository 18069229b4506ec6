use serde::{Deserialize, Serialize};

/// Per-response metrics
///
/// Quality scores are `None` when no scorer ran, which is not the same as a
/// score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsData {
    /// Character count of the response text
    pub response_length: u64,
    pub token_count: u64,
    /// True when `token_count` is an approximation rather than provider accounting
    #[serde(default)]
    pub token_count_estimated: bool,
    pub latency_ms: u64,
    /// Estimated cost in USD
    pub cost_estimate: f64,
    pub sentiment_score: Option<f64>,
    pub readability_score: Option<f64>,
    pub coherence_score: Option<f64>,
}

impl MetricsData {
    pub fn has_quality_scores(&self) -> bool {
        self.sentiment_score.is_some()
            || self.readability_score.is_some()
            || self.coherence_score.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_scores_serialize_as_null() {
        let metrics = MetricsData {
            response_length: 6,
            token_count: 3,
            token_count_estimated: false,
            latency_ms: 120,
            cost_estimate: 0.0,
            sentiment_score: None,
            readability_score: Some(0.0),
            coherence_score: None,
        };

        let json = serde_json::to_value(&metrics).unwrap();

        assert!(json["sentiment_score"].is_null());
        assert_eq!(json["readability_score"], serde_json::json!(0.0));
        assert!(metrics.has_quality_scores());
    }
}
