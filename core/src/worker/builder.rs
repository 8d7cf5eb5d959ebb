//! Builder pattern for Worker construction

use crate::clock::{Stopwatch, Timer};
use crate::config::RunPlan;
use crate::error::{BenchError, BenchResult};
use crate::state::RunState;
use crate::traits::{ExecutionCondition, TestFn};

use super::executor::Worker;
use super::think_time::ThinkTime;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .test(test)
///     .plan(plan)
///     .state(state)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    test: Option<TestFn>,
    execution_condition: Option<ExecutionCondition>,
    plan: Option<Arc<RunPlan>>,
    state: Option<Arc<RunState>>,
    timer: Option<Box<dyn Timer>>,
    seed: Option<u64>,
    cancel: Option<CancellationToken>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            test: None,
            execution_condition: None,
            plan: None,
            state: None,
            timer: None,
            seed: None,
            cancel: None,
        }
    }

    /// Set the unit of work
    pub fn test(mut self, test: TestFn) -> Self {
        self.test = Some(test);
        self
    }

    /// Set the execution condition
    pub fn execution_condition(mut self, condition: Option<ExecutionCondition>) -> Self {
        self.execution_condition = condition;
        self
    }

    /// Set the validated run plan
    pub fn plan(mut self, plan: Arc<RunPlan>) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Set the shared run state
    pub fn state(mut self, state: Arc<RunState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the per-worker timer (defaults to a [`Stopwatch`])
    pub fn timer(mut self, timer: Box<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Seed the think-time sampler
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the cancellation token (defaults to one that is never cancelled)
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<Worker> {
        let test = self.test.ok_or(BenchError::missing_config("test"))?;
        let plan = self.plan.ok_or(BenchError::missing_config("plan"))?;
        let state = self.state.ok_or(BenchError::missing_config("state"))?;

        let timer = self
            .timer
            .unwrap_or_else(|| Box::new(Stopwatch::new()));
        let think_time = match self.seed {
            Some(seed) => ThinkTime::seeded(plan.pacing(), seed),
            None => ThinkTime::new(plan.pacing()),
        };
        let cancel = self.cancel.unwrap_or_default();

        Ok(Worker::new(
            self.id,
            test,
            self.execution_condition,
            plan,
            state,
            timer,
            think_time,
            cancel,
        ))
    }
}
