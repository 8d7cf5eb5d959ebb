//! Builder pattern for Orchestrator construction

use std::time::Duration;

use crate::clock::{stopwatch_factory, TimerFactory};
use crate::config::{ExceptionMode, Settings, WaitRange};
use crate::error::{BenchError, BenchResult};
use crate::traits::{ErrorClassifier, ExecutionCondition, TestFn};

use super::aggregator::TimePeriod;
use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with validated settings
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .name("checkout")
///     .concurrency(8)
///     .number_of_executions(10_000)
///     .test(test_fn(|| place_order()))
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    name: Option<String>,
    settings: Settings,
    test: Option<TestFn>,
    execution_condition: Option<ExecutionCondition>,
    timer_factory: Option<TimerFactory>,
    period: TimePeriod,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default settings
    pub fn new() -> Self {
        Self {
            name: None,
            settings: Settings::default(),
            test: None,
            execution_condition: None,
            timer_factory: None,
            period: TimePeriod::default(),
        }
    }

    /// Set the benchmark name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the full settings
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the concurrency level
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self
    }

    /// Stop after this many executions across all workers
    pub fn number_of_executions(mut self, n: u64) -> Self {
        self.settings.number_of_executions = Some(n);
        self
    }

    /// Stop once the run is this old
    pub fn time_to_run(mut self, d: Duration) -> Self {
        self.settings.time_to_run = Some(d);
        self
    }

    /// Never start an execution once this many have completed
    pub fn max_number_of_executions(mut self, n: u64) -> Self {
        self.settings.max_number_of_executions = Some(n);
        self
    }

    /// Never start an execution once the run is this old
    pub fn max_time_to_run(mut self, d: Duration) -> Self {
        self.settings.max_time_to_run = Some(d);
        self
    }

    /// Switch to user simulation with the given think time
    pub fn user_simulation(mut self, wait: WaitRange) -> Self {
        self.settings = self.settings.with_user_simulation(wait);
        self
    }

    /// Set the exception mode
    pub fn exception_mode(mut self, mode: ExceptionMode) -> Self {
        self.settings.exception_mode = mode;
        self
    }

    /// Set the error classifier (COUNT mode only)
    pub fn error_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.settings.error_classifier = Some(classifier);
        self
    }

    /// Set the unit of work
    pub fn test(mut self, test: TestFn) -> Self {
        self.test = Some(test);
        self
    }

    /// Set the execution condition
    pub fn execution_condition(mut self, condition: ExecutionCondition) -> Self {
        self.execution_condition = Some(condition);
        self
    }

    /// Set the timer factory (defaults to [`Stopwatch`](crate::clock::Stopwatch))
    pub fn timer_factory(mut self, factory: TimerFactory) -> Self {
        self.timer_factory = Some(factory);
        self
    }

    /// Set the unit of the aggregate execution rate
    pub fn period(mut self, period: TimePeriod) -> Self {
        self.period = period;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the test is not set, or if settings validation
    /// fails.
    pub fn build(self) -> BenchResult<Orchestrator> {
        let test = self.test.ok_or_else(|| BenchError::missing_config("test"))?;
        let plan = self.settings.plan()?;

        Ok(Orchestrator::new(
            self.name,
            plan,
            test,
            self.execution_condition,
            self.timer_factory.unwrap_or_else(stopwatch_factory),
            self.period,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
