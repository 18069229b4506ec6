//! Per-response metrics: objective measurements, cost and quality heuristics

mod computer;
mod data;
mod pricing;
mod scoring;

pub use computer::{
    estimate_tokens, sanitize_chars_per_token, MetricsComputer, DEFAULT_CHARS_PER_TOKEN,
};
pub use data::MetricsData;
pub use pricing::PriceTable;
pub use scoring::{HeuristicScorer, QualityScorer, QualityScores};
