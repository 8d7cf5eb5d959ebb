//! Orchestrator execution logic

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::clock::TimerFactory;
use crate::config::RunPlan;
use crate::error::{BenchError, BenchResult};
use crate::state::RunState;
use crate::traits::{ExecutionCondition, TestFn};
use crate::worker::{WorkerBuilder, WorkerResult};

use super::aggregator::{aggregate_worker_results, TimePeriod};
use super::result::RunResult;

/// Orchestrator manages the run lifecycle
///
/// Responsible for creating the shared run state, starting one worker thread
/// per concurrency unit, waiting for all of them and aggregating their
/// results. An orchestrator can be run any number of times; every run gets
/// fresh state.
pub struct Orchestrator {
    /// Optional benchmark name, copied into every result
    pub(crate) name: Option<String>,

    /// Validated settings (shared with workers)
    pub(crate) plan: Arc<RunPlan>,

    /// The unit of work (shared across workers)
    pub(crate) test: TestFn,

    /// Optional per-iteration gate (shared across workers)
    pub(crate) execution_condition: Option<ExecutionCondition>,

    /// Source of the run clock and per-worker timers
    pub(crate) timer_factory: TimerFactory,

    /// Unit for the aggregate execution rate
    pub(crate) period: TimePeriod,

    /// Parent of every run's cancellation token
    pub(crate) shutdown: CancellationToken,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        name: Option<String>,
        plan: RunPlan,
        test: TestFn,
        execution_condition: Option<ExecutionCondition>,
        timer_factory: TimerFactory,
        period: TimePeriod,
    ) -> Self {
        Self {
            name,
            plan: Arc::new(plan),
            test,
            execution_condition,
            timer_factory,
            period,
            shutdown: CancellationToken::new(),
        }
    }

    /// Benchmark name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the validated run plan
    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Cancel the current run and every future one
    ///
    /// Workers stop before their next execution with
    /// [`StopReason::Cancelled`](crate::worker::StopReason::Cancelled).
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`Orchestrator::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Run once
    ///
    /// Starts all workers, waits for every one of them to stop and returns
    /// the aggregate. Errors raised by the test never fail the run, except in
    /// RETHROW mode; inspect [`RunResult::has_errors`] instead.
    pub async fn run(&self) -> BenchResult<RunResult> {
        self.execute(None, self.shutdown.child_token()).await
    }

    /// Run once, labelling the result
    pub async fn run_named(&self, result_name: impl Into<String>) -> BenchResult<RunResult> {
        self.execute(Some(result_name.into()), self.shutdown.child_token())
            .await
    }

    /// Run with a timeout
    ///
    /// Cancels the run when the timeout is reached; the workers still report
    /// what they completed.
    pub async fn run_with_timeout(&self, timeout: Duration) -> BenchResult<RunResult> {
        let token = self.shutdown.child_token();
        let trigger = token.clone();

        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!(
                timeout_ms = timeout.as_millis(),
                "Timeout reached, cancelling run"
            );
            trigger.cancel();
        });

        let result = self.execute(None, token).await;
        timeout_handle.abort();

        result
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Cancels the run on Ctrl+C.
    pub async fn run_with_signal_handling(&self) -> BenchResult<RunResult> {
        let token = self.shutdown.child_token();
        let trigger = token.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, cancelling run");
                    trigger.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.execute(None, token).await;
        signal_handle.abort();

        result
    }

    async fn execute(
        &self,
        result_name: Option<String>,
        cancel: CancellationToken,
    ) -> BenchResult<RunResult> {
        let concurrency = self.plan.concurrency();
        let started_at = Utc::now();

        tracing::info!(
            benchmark = self.name.as_deref().unwrap_or(""),
            concurrency,
            mode = %self.plan.mode(),
            primary = ?self.plan.primary(),
            secondary = ?self.plan.secondary(),
            exception_mode = ?self.plan.exceptions().mode(),
            "Starting run"
        );

        let state = Arc::new(RunState::start((self.timer_factory)()));
        let mut handoffs = Vec::with_capacity(concurrency);

        for worker_id in 0..concurrency {
            let worker = WorkerBuilder::new(worker_id)
                .test(Arc::clone(&self.test))
                .execution_condition(self.execution_condition.clone())
                .plan(Arc::clone(&self.plan))
                .state(Arc::clone(&state))
                .timer((self.timer_factory)())
                .cancel(cancel.clone())
                .build()?;

            let (tx, rx) = oneshot::channel();
            let spawned = std::thread::Builder::new()
                .name(format!("stampede-worker-{worker_id}"))
                .spawn(move || {
                    // The receiver only goes away if the run future was dropped
                    let _ = tx.send(worker.run());
                });

            if let Err(e) = spawned {
                tracing::error!(worker_id, error = %e, "Failed to spawn worker thread");
                cancel.cancel();
                join_all(handoffs).await;
                return Err(e.into());
            }
            handoffs.push(rx);
        }

        // Any failing worker cancels its siblings as soon as it reports
        let outcomes = join_all(handoffs.into_iter().enumerate().map(|(worker_id, rx)| {
            let cancel = cancel.clone();
            async move {
                let outcome = rx.await.unwrap_or_else(|_| {
                    Err(BenchError::worker(format!(
                        "worker {worker_id} exited without reporting"
                    )))
                });
                if outcome.is_err() {
                    cancel.cancel();
                }
                outcome
            }
        }))
        .await;

        let workers = collect_results(outcomes)?;
        let elapsed = state.elapsed();

        let stats =
            aggregate_worker_results(&workers, self.plan.exceptions().mode(), self.period.clone());

        let shared_total = state.completed_executions();
        if shared_total != stats.total_completed {
            tracing::warn!(
                shared_total,
                summed_total = stats.total_completed,
                "Shared execution counter disagrees with worker totals"
            );
        }

        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            total_completed = stats.total_completed,
            total_exceptions = stats.total_exceptions,
            executions_per_period = stats.executions_per_period,
            period = stats.period.name(),
            has_errors = stats.has_errors,
            "Run completed"
        );

        Ok(RunResult {
            benchmark_name: self.name.clone(),
            result_name,
            mode: self.plan.mode(),
            started_at,
            elapsed,
            shared_completed_executions: shared_total,
            workers,
            stats,
        })
    }
}

/// Unwrap worker outcomes in index order, surfacing the lowest-index failure
fn collect_results(outcomes: Vec<BenchResult<WorkerResult>>) -> BenchResult<Vec<WorkerResult>> {
    let mut workers = Vec::with_capacity(outcomes.len());
    let mut first_failure = None;

    for (worker_id, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => workers.push(result),
            Err(e) => {
                tracing::error!(worker_id, error = %e, "Worker failed");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(workers),
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.name)
            .field("plan", &self.plan)
            .field("period", &self.period)
            .field("execution_condition", &self.execution_condition.is_some())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}
