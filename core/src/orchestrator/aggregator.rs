//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::config::ExceptionMode;
use crate::traits::{serialize_test_error, TestError};
use crate::worker::WorkerResult;

/// Unit used to express execution rates
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    /// Executions per second
    #[default]
    Second,

    /// Executions per minute
    Minute,

    /// Executions per hour
    Hour,

    /// A caller-defined period
    Custom {
        /// Display name, e.g. "day"
        name: String,
        /// Length of one period
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        duration: Duration,
    },
}

impl TimePeriod {
    /// Create a caller-defined period
    pub fn custom(name: impl Into<String>, duration: Duration) -> Self {
        TimePeriod::Custom {
            name: name.into(),
            duration,
        }
    }

    /// Singular unit name
    pub fn name(&self) -> &str {
        match self {
            TimePeriod::Second => "second",
            TimePeriod::Minute => "minute",
            TimePeriod::Hour => "hour",
            TimePeriod::Custom { name, .. } => name,
        }
    }

    /// Length of one period
    pub fn duration(&self) -> Duration {
        match self {
            TimePeriod::Second => Duration::from_secs(1),
            TimePeriod::Minute => Duration::from_secs(60),
            TimePeriod::Hour => Duration::from_secs(3600),
            TimePeriod::Custom { duration, .. } => *duration,
        }
    }
}

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that reported
    pub total_workers: usize,

    /// Sum of per-worker completed executions
    pub total_completed: u64,

    /// Sum of per-worker counted errors
    pub total_exceptions: u64,

    /// Time spent inside the test, summed over workers
    pub total_worker_time: Duration,

    /// `total_worker_time / total_completed`; zero if nothing completed
    pub average_time_per_execution: Duration,

    /// Sum of per-worker rates over `period`
    ///
    /// Overlapping workers make this larger than wall-clock throughput.
    pub executions_per_period: f64,

    /// Unit of `executions_per_period`
    pub period: TimePeriod,

    /// Any uncounted error, or any counted error in COUNT mode
    pub has_errors: bool,

    /// First counted error in worker index order
    #[serde(serialize_with = "serialize_test_error")]
    pub first_counted_error: Option<TestError>,

    /// First uncounted error in worker index order
    #[serde(serialize_with = "serialize_test_error")]
    pub first_uncounted_error: Option<TestError>,
}

/// Aggregate results from multiple workers
///
/// `results` must be ordered by worker index. The function is pure: the same
/// input always yields the same output.
pub fn aggregate_worker_results(
    results: &[WorkerResult],
    exception_mode: ExceptionMode,
    period: TimePeriod,
) -> AggregatedStats {
    if results.is_empty() {
        return AggregatedStats {
            period,
            ..Default::default()
        };
    }

    let total_completed: u64 = results.iter().map(|r| r.completed_executions).sum();
    let total_exceptions: u64 = results.iter().map(|r| r.exception_count).sum();
    let total_nanos: u128 = results.iter().map(|r| r.elapsed.as_nanos()).sum();

    let average_time_per_execution = if total_completed == 0 {
        Duration::ZERO
    } else {
        nanos_to_duration(total_nanos / u128::from(total_completed))
    };

    let period_length = period.duration();
    let executions_per_period: f64 = results
        .iter()
        .map(|r| r.executions_per(period_length))
        .sum();

    let first_counted_error = results
        .iter()
        .find_map(|r| r.first_counted_error.clone());
    let first_uncounted_error = results
        .iter()
        .find_map(|r| r.first_uncounted_error.clone());

    let has_errors = first_uncounted_error.is_some()
        || (exception_mode == ExceptionMode::Count && total_exceptions > 0);

    AggregatedStats {
        total_workers: results.len(),
        total_completed,
        total_exceptions,
        total_worker_time: nanos_to_duration(total_nanos),
        average_time_per_execution,
        executions_per_period,
        period,
        has_errors,
        first_counted_error,
        first_uncounted_error,
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = nanos / 1_000_000_000;
    let subsec = (nanos % 1_000_000_000) as u32;
    Duration::new(u64::try_from(secs).unwrap_or(u64::MAX), subsec)
}
