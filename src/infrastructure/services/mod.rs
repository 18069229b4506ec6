//! Application services

mod aggregator;
mod experiment_service;
mod scheduler;

pub use aggregator::{ExperimentAggregator, RequestMeta};
pub use experiment_service::{AbOutcome, ExperimentOutcome, ExperimentService};
pub use scheduler::{CallLimiter, RunScheduler, SchedulerSettings, TIMEOUT_ERROR};
