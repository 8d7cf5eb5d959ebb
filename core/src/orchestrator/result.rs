//! Immutable outcome of one run

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::BenchmarkMode;
use crate::traits::TestError;
use crate::worker::WorkerResult;

use super::aggregator::{AggregatedStats, TimePeriod};

/// Result of one run: the per-worker records and their aggregate
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub(crate) benchmark_name: Option<String>,
    pub(crate) result_name: Option<String>,
    pub(crate) mode: BenchmarkMode,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) elapsed: Duration,
    pub(crate) shared_completed_executions: u64,
    pub(crate) workers: Vec<WorkerResult>,
    pub(crate) stats: AggregatedStats,
}

impl RunResult {
    /// Name of the benchmark that produced this result
    pub fn benchmark_name(&self) -> Option<&str> {
        self.benchmark_name.as_deref()
    }

    /// Name given to this particular run
    pub fn result_name(&self) -> Option<&str> {
        self.result_name.as_deref()
    }

    /// Mode the run was executed in
    pub fn mode(&self) -> BenchmarkMode {
        self.mode
    }

    /// Wall-clock time the run began
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time from run begin until the last worker stopped
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Per-worker records, in worker index order
    pub fn workers(&self) -> &[WorkerResult] {
        &self.workers
    }

    /// Aggregate over all workers
    pub fn stats(&self) -> &AggregatedStats {
        &self.stats
    }

    /// Total completed executions across workers
    pub fn total_completed_executions(&self) -> u64 {
        self.stats.total_completed
    }

    /// Final value of the run's shared execution counter
    ///
    /// Always equal to [`RunResult::total_completed_executions`].
    pub fn shared_completed_executions(&self) -> u64 {
        self.shared_completed_executions
    }

    /// Total counted errors across workers
    pub fn exception_count(&self) -> u64 {
        self.stats.total_exceptions
    }

    /// Average time spent in the test per execution
    pub fn average_time_per_execution(&self) -> Duration {
        self.stats.average_time_per_execution
    }

    /// Summed per-worker execution rate
    ///
    /// `None` in user simulation mode, where think time dominates the rate.
    pub fn executions_per_period(&self) -> Option<f64> {
        match self.mode {
            BenchmarkMode::Benchmark => Some(self.stats.executions_per_period),
            BenchmarkMode::UserSimulation => None,
        }
    }

    /// Unit of [`RunResult::executions_per_period`]
    pub fn period(&self) -> &TimePeriod {
        &self.stats.period
    }

    /// Whether any worker recorded an error that should be reported
    pub fn has_errors(&self) -> bool {
        self.stats.has_errors
    }

    /// First counted error, in worker index order
    pub fn first_counted_error(&self) -> Option<&TestError> {
        self.stats.first_counted_error.as_ref()
    }

    /// First uncounted error, in worker index order
    pub fn first_uncounted_error(&self) -> Option<&TestError> {
        self.stats.first_uncounted_error.as_ref()
    }
}
