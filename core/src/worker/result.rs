//! Per-worker outcome record

use std::time::Duration;

use serde::Serialize;

use crate::traits::{serialize_test_error, TestError};

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The worker has not stopped (yet)
    #[default]
    None,

    /// Primary duration reached
    TimeLimit,

    /// Primary execution count reached
    CountLimit,

    /// Secondary duration ceiling reached
    SecondaryTimeLimit,

    /// Secondary execution ceiling reached
    SecondaryCountLimit,

    /// The execution condition returned `false`
    ExecutionConditionFalse,

    /// The test failed in STOP mode
    Exception,

    /// The run was cancelled from outside
    Cancelled,
}

/// Outcome of one worker
///
/// Mutated only by its worker, then handed to the orchestrator by value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerResult {
    /// Worker index
    pub worker_id: usize,

    /// Time spent inside the test, summed over all executions
    pub elapsed: Duration,

    /// Executions this worker completed
    pub completed_executions: u64,

    /// Why the worker stopped
    pub stop_reason: StopReason,

    /// Counted errors (COUNT mode)
    pub exception_count: u64,

    /// First error accepted by the classifier
    #[serde(serialize_with = "serialize_test_error")]
    pub first_counted_error: Option<TestError>,

    /// First error not counted (or the stopping error in STOP mode)
    #[serde(serialize_with = "serialize_test_error")]
    pub first_uncounted_error: Option<TestError>,
}

impl WorkerResult {
    /// Create an empty record for the given worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Average time per execution; zero if nothing completed
    pub fn average_time_per_execution(&self) -> Duration {
        if self.completed_executions == 0 {
            Duration::ZERO
        } else {
            let nanos = self.elapsed.as_nanos() / u128::from(self.completed_executions);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }

    /// Executions per `period` of time spent in the test; zero if no time was measured
    pub fn executions_per(&self, period: Duration) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed_executions as f64 * period.as_secs_f64() / secs
        } else {
            0.0
        }
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        self.exception_count > 0 || self.first_uncounted_error.is_some()
    }

    /// Whether the worker stopped on an error
    pub fn stopped_on_error(&self) -> bool {
        self.stop_reason == StopReason::Exception
    }

    /// Record a counted error
    pub fn record_counted_error(&mut self, error: &TestError) {
        self.exception_count += 1;
        if self.first_counted_error.is_none() {
            self.first_counted_error = Some(error.clone());
        }
    }

    /// Record an uncounted error, keeping only the first one
    ///
    /// Returns `true` if this was the first uncounted error.
    pub fn record_uncounted_error(&mut self, error: &TestError) -> bool {
        if self.first_uncounted_error.is_none() {
            self.first_uncounted_error = Some(error.clone());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn error(msg: &'static str) -> TestError {
        Arc::new(anyhow::anyhow!(msg))
    }

    #[test]
    fn test_worker_result_defaults() {
        let result = WorkerResult::new(7);
        assert_eq!(result.worker_id, 7);
        assert_eq!(result.completed_executions, 0);
        assert_eq!(result.exception_count, 0);
        assert_eq!(result.stop_reason, StopReason::None);
        assert_eq!(result.elapsed, Duration::ZERO);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_average_time_per_execution() {
        let mut result = WorkerResult::new(0);
        assert_eq!(result.average_time_per_execution(), Duration::ZERO);

        result.elapsed = Duration::from_millis(300);
        result.completed_executions = 3;
        assert_eq!(result.average_time_per_execution(), Duration::from_millis(100));

        // Nanosecond precision is kept
        result.elapsed = Duration::from_nanos(10);
        result.completed_executions = 3;
        assert_eq!(result.average_time_per_execution(), Duration::from_nanos(3));
    }

    #[test]
    fn test_executions_per_period() {
        let mut result = WorkerResult::new(0);
        assert_eq!(result.executions_per(Duration::from_secs(1)), 0.0);

        result.elapsed = Duration::from_millis(500);
        result.completed_executions = 10;
        assert!((result.executions_per(Duration::from_secs(1)) - 20.0).abs() < 1e-9);
        assert!((result.executions_per(Duration::from_secs(60)) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_counted_error_keeps_first() {
        let mut result = WorkerResult::new(0);
        result.record_counted_error(&error("first"));
        result.record_counted_error(&error("second"));

        assert_eq!(result.exception_count, 2);
        let first = result.first_counted_error.as_ref().unwrap();
        assert_eq!(first.to_string(), "first");
        assert!(result.has_errors());
    }

    #[test]
    fn test_record_uncounted_error_keeps_first() {
        let mut result = WorkerResult::new(0);
        assert!(result.record_uncounted_error(&error("first")));
        assert!(!result.record_uncounted_error(&error("second")));

        assert_eq!(result.exception_count, 0);
        let first = result.first_uncounted_error.as_ref().unwrap();
        assert_eq!(first.to_string(), "first");
        assert!(result.has_errors());
    }

    #[test]
    fn test_stop_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&StopReason::SecondaryCountLimit).unwrap(),
            "\"secondary_count_limit\""
        );
        assert_eq!(
            serde_json::to_string(&StopReason::ExecutionConditionFalse).unwrap(),
            "\"execution_condition_false\""
        );
    }

    #[test]
    fn test_worker_result_serialization() {
        let mut result = WorkerResult::new(1);
        result.completed_executions = 4;
        result.stop_reason = StopReason::Exception;
        result.record_uncounted_error(&error("broken"));

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"stop_reason\":\"exception\""));
        assert!(json.contains("\"first_uncounted_error\":\"broken\""));
        assert!(json.contains("\"first_counted_error\":null"));
    }
}
