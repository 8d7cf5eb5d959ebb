//! Worker execution loop

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::clock::Timer;
use crate::config::{ExceptionPolicy, PrimaryLimit, RunPlan, SecondaryLimit};
use crate::error::{BenchError, BenchResult};
use crate::state::RunState;
use crate::traits::{ExecutionCondition, TestError, TestFn};

use super::result::{StopReason, WorkerResult};
use super::think_time::ThinkTime;

/// What happened to one failed execution
enum Failure {
    /// Recorded; the execution still counts as completed
    Tolerated,
    /// Recorded; the worker stops
    Stop,
    /// Returned to the caller
    Rethrow(TestError),
}

/// One worker: runs the test in a loop until a stop condition holds
///
/// Each iteration checks, in order: the execution condition, cancellation,
/// the secondary count ceiling, the secondary duration ceiling. Only then is
/// the test invoked. The primary limit is checked after an execution
/// completes, so a worker always stops on an execution boundary.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// The unit of work (shared across workers)
    test: TestFn,

    /// Optional per-iteration gate (shared across workers)
    execution_condition: Option<ExecutionCondition>,

    /// Validated settings
    plan: Arc<RunPlan>,

    /// Shared counter and run clock
    state: Arc<RunState>,

    /// Measures time spent inside the test only
    timer: Box<dyn Timer>,

    /// Pause sampler for user simulation
    think_time: ThinkTime,

    /// Cooperative cancellation
    cancel: CancellationToken,
}

impl Worker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        test: TestFn,
        execution_condition: Option<ExecutionCondition>,
        plan: Arc<RunPlan>,
        state: Arc<RunState>,
        timer: Box<dyn Timer>,
        think_time: ThinkTime,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            test,
            execution_condition,
            plan,
            state,
            timer,
            think_time,
            cancel,
        }
    }

    /// Run the worker loop on the current thread
    ///
    /// Returns the frozen [`WorkerResult`] once a stop condition holds. In
    /// RETHROW mode a failing test ends the loop with [`BenchError::Rethrown`].
    pub fn run(mut self) -> BenchResult<WorkerResult> {
        let mut result = WorkerResult::new(self.id);

        tracing::debug!(worker_id = self.id, "Worker started");

        let stop_reason = loop {
            if let Some(reason) = self.check_before_execution() {
                break reason;
            }

            self.timer.start();
            let outcome = (self.test)();
            self.timer.stop();

            if let Err(error) = outcome {
                match self.handle_failure(&mut result, Arc::new(error)) {
                    Failure::Tolerated => {}
                    Failure::Stop => break StopReason::Exception,
                    Failure::Rethrow(error) => {
                        result.elapsed = self.timer.elapsed();
                        tracing::debug!(
                            worker_id = self.id,
                            completed = result.completed_executions,
                            "Worker rethrowing test error"
                        );
                        return Err(BenchError::rethrown(self.id, error));
                    }
                }
            }

            result.completed_executions += 1;
            let completed_overall = self.state.increment_completed_executions();

            if let Some(reason) = self.check_primary_limit(completed_overall) {
                break reason;
            }

            if let Some(wait) = self.think_time.sample() {
                if let Some(max) = self.plan.max_duration() {
                    // Don't start a pause that would end past the ceiling
                    let pause_ends = self.state.elapsed().checked_add(wait);
                    if pause_ends.map_or(true, |end| end >= max) {
                        break StopReason::SecondaryTimeLimit;
                    }
                }
                std::thread::sleep(wait);
            }
        };

        result.stop_reason = stop_reason;
        result.elapsed = self.timer.elapsed();

        tracing::debug!(
            worker_id = self.id,
            completed = result.completed_executions,
            exceptions = result.exception_count,
            stop_reason = ?result.stop_reason,
            elapsed_ms = result.elapsed.as_millis(),
            "Worker finished"
        );

        Ok(result)
    }

    /// Checks evaluated before starting an execution, in priority order
    fn check_before_execution(&self) -> Option<StopReason> {
        if let Some(condition) = &self.execution_condition {
            if !condition() {
                return Some(StopReason::ExecutionConditionFalse);
            }
        }

        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }

        match self.plan.secondary() {
            Some(SecondaryLimit::MaxExecutions(max))
                if self.state.completed_executions() >= max =>
            {
                Some(StopReason::SecondaryCountLimit)
            }
            Some(SecondaryLimit::MaxDuration(max)) if self.state.elapsed() >= max => {
                Some(StopReason::SecondaryTimeLimit)
            }
            _ => None,
        }
    }

    /// Primary limit, checked against the shared post-increment count
    fn check_primary_limit(&self, completed_overall: u64) -> Option<StopReason> {
        match self.plan.primary() {
            PrimaryLimit::Executions(n) if completed_overall >= n => Some(StopReason::CountLimit),
            PrimaryLimit::Duration(d) if self.state.elapsed() >= d => Some(StopReason::TimeLimit),
            _ => None,
        }
    }

    /// Apply the exception policy to a failed execution
    fn handle_failure(&self, result: &mut WorkerResult, error: TestError) -> Failure {
        match self.plan.exceptions() {
            ExceptionPolicy::Count { classifier } => {
                let counted = classifier.as_ref().map_or(true, |classify| classify(&*error));
                if counted {
                    tracing::trace!(worker_id = self.id, error = %error, "Counted test error");
                    result.record_counted_error(&error);
                } else if result.record_uncounted_error(&error) {
                    tracing::warn!(
                        worker_id = self.id,
                        error = %error,
                        "Uncounted test error"
                    );
                }
                Failure::Tolerated
            }
            ExceptionPolicy::Stop => {
                tracing::warn!(worker_id = self.id, error = %error, "Test failed, stopping worker");
                result.record_uncounted_error(&error);
                Failure::Stop
            }
            ExceptionPolicy::Rethrow => Failure::Rethrow(error),
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("plan", &self.plan)
            .field("execution_condition", &self.execution_condition.is_some())
            .field("think_time", &self.think_time)
            .finish()
    }
}
