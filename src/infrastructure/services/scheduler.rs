//! Concurrent execution of an experiment's call tasks
//!
//! Every task owns its timeout and its failure. Outbound concurrency is
//! bounded by a [`CallLimiter`] shared by all experiments in the process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn};

use crate::domain::demo::{DemoFallbackGenerator, DemoReason};
use crate::domain::experiment::{CallTask, ExperimentRequest, PromptVariant, ResponseRecord};
use crate::domain::llm::TokenUsage;
use crate::domain::metrics::MetricsComputer;
use crate::infrastructure::llm::ProviderRegistry;
use crate::infrastructure::observability::{record_provider_call, CallOutcome};

/// Error recorded for a task that exceeded its deadline
pub const TIMEOUT_ERROR: &str = "timeout";

// ============================================================================
// CallLimiter
// ============================================================================

/// Process-wide cap on in-flight provider calls.
///
/// A permit is held for the duration of one provider call and released when
/// the call returns or times out. Waiters are served in FIFO order.
#[derive(Debug, Clone)]
pub struct CallLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl CallLimiter {
    /// A limit of zero is raised to one
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

// ============================================================================
// RunScheduler
// ============================================================================

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub task_timeout: Duration,
    /// Answer every task with a demo response without calling providers
    pub demo_mode: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(30),
            demo_mode: false,
        }
    }
}

/// Expands requests into call tasks and runs them concurrently
#[derive(Debug, Clone)]
pub struct RunScheduler {
    registry: Arc<ProviderRegistry>,
    limiter: CallLimiter,
    computer: Arc<MetricsComputer>,
    demo: DemoFallbackGenerator,
    settings: SchedulerSettings,
}

impl RunScheduler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        limiter: CallLimiter,
        computer: Arc<MetricsComputer>,
    ) -> Self {
        Self {
            registry,
            limiter,
            computer,
            demo: DemoFallbackGenerator::new(),
            settings: SchedulerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn limiter(&self) -> &CallLimiter {
        &self.limiter
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Run every (model config, run) pair of `request.prompt` and return one
    /// record per task in expansion order.
    ///
    /// Never fails: task failures become error records. Tasks are spawned, so
    /// if the caller stops polling they still run to completion and their
    /// results are dropped.
    pub async fn schedule(
        &self,
        request: &ExperimentRequest,
        variant: PromptVariant,
    ) -> Vec<ResponseRecord> {
        let prompt: Arc<str> = Arc::from(request.prompt.as_str());
        let tasks = CallTask::expand(&request.model_configs, request.num_runs, variant);

        debug!(
            tasks = tasks.len(),
            variant = %variant,
            "Scheduling experiment tasks"
        );

        let identities: Vec<CallTask> = tasks.clone();
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let scheduler = self.clone();
                let prompt = Arc::clone(&prompt);
                tokio::spawn(async move { scheduler.run_task(task, &prompt).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(identities)
            .map(|(joined, task)| match joined {
                Ok(record) => record,
                Err(e) => {
                    error!(slot = task.slot, error = %e, "Call task did not complete");
                    ResponseRecord::failure(
                        (*task.model_config).clone(),
                        task.run_number,
                        task.prompt_variant,
                        format!("task failed: {}", e),
                    )
                }
            })
            .collect()
    }

    async fn run_task(&self, task: CallTask, prompt: &str) -> ResponseRecord {
        let config = &*task.model_config;
        let provider_name = config.provider.as_str();

        if self.settings.demo_mode {
            let started = Instant::now();
            let record = self.demo_record(&task, prompt, DemoReason::Forced, started);
            record_provider_call(provider_name, CallOutcome::Demo, started.elapsed());
            return record;
        }

        let permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Call limiter closed");
                return ResponseRecord::failure(
                    config.clone(),
                    task.run_number,
                    task.prompt_variant,
                    "scheduler unavailable",
                );
            }
        };

        debug!(
            provider = provider_name,
            model = %config.model_name,
            run = task.run_number,
            "Calling provider"
        );

        let provider = self.registry.get(config.provider);
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.settings.task_timeout,
            provider.complete(prompt, config),
        )
        .await;
        let elapsed = started.elapsed();
        drop(permit);

        match outcome {
            Err(_) => {
                warn!(
                    provider = provider_name,
                    model = %config.model_name,
                    run = task.run_number,
                    timeout_ms = self.settings.task_timeout.as_millis() as u64,
                    "Provider call timed out"
                );
                record_provider_call(provider_name, CallOutcome::Timeout, elapsed);
                ResponseRecord::failure(
                    config.clone(),
                    task.run_number,
                    task.prompt_variant,
                    TIMEOUT_ERROR,
                )
            }
            Ok(Ok(completion)) => {
                record_provider_call(provider_name, CallOutcome::Success, elapsed);
                let usage = self
                    .computer
                    .complete_usage(&completion.text, completion.token_usage);
                let metrics = self.computer.compute(
                    &completion.text,
                    elapsed.as_millis() as u64,
                    config,
                    &usage,
                );

                debug!(
                    provider = provider_name,
                    model = %config.model_name,
                    run = task.run_number,
                    latency_ms = metrics.latency_ms,
                    "Provider call succeeded"
                );

                ResponseRecord::success(
                    config.clone(),
                    task.run_number,
                    task.prompt_variant,
                    completion.text,
                    metrics,
                    usage,
                )
            }
            Ok(Err(e)) if e.triggers_demo_fallback() => {
                warn!(
                    provider = provider_name,
                    model = %config.model_name,
                    run = task.run_number,
                    kind = %e.kind,
                    "Provider unavailable, answering with demo response"
                );
                record_provider_call(provider_name, CallOutcome::Demo, elapsed);
                self.demo_record(&task, prompt, DemoReason::Fallback(e.kind), started)
            }
            Ok(Err(e)) => {
                debug!(
                    provider = provider_name,
                    model = %config.model_name,
                    run = task.run_number,
                    error = %e,
                    "Provider call failed"
                );
                record_provider_call(provider_name, CallOutcome::Error, elapsed);
                ResponseRecord::failure(
                    config.clone(),
                    task.run_number,
                    task.prompt_variant,
                    e.to_string(),
                )
            }
        }
    }

    /// Demo text with metrics computed like any other response; latency
    /// covers the failed call when there was one
    fn demo_record(
        &self,
        task: &CallTask,
        prompt: &str,
        reason: DemoReason,
        started: Instant,
    ) -> ResponseRecord {
        let config = &*task.model_config;
        let text = self.demo.generate(prompt, config, reason);
        let usage = TokenUsage::estimated(
            self.computer
                .estimate_tokens(text.chars().count() as u64),
        );
        let metrics = self.computer.compute(
            &text,
            started.elapsed().as_millis() as u64,
            config,
            &usage,
        );

        ResponseRecord::demo(
            config.clone(),
            task.run_number,
            task.prompt_variant,
            text,
            metrics,
            usage,
        )
    }
}
