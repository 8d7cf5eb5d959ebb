//! Run settings, validation and the validated run plan
//!
//! [`Settings`] is the flat, serializable configuration surface. It can hold
//! inconsistent combinations, so it is never handed to a worker directly:
//! [`Settings::plan`] validates it and lowers it into a [`RunPlan`] made of
//! closed variants that the worker loop dispatches on.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::traits::ErrorClassifier;

/// How workers pace their executions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMode {
    /// Execute the test as often as possible
    #[default]
    Benchmark,

    /// Every worker is a simulated user pausing between executions
    UserSimulation,
}

impl BenchmarkMode {
    /// Human-readable name
    pub fn friendly_name(&self) -> &'static str {
        match self {
            BenchmarkMode::Benchmark => "Benchmark",
            BenchmarkMode::UserSimulation => "User simulation",
        }
    }
}

impl fmt::Display for BenchmarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly_name())
    }
}

/// What a worker does when the test returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionMode {
    /// Record the error and keep going. Errors accepted by the classifier
    /// (all of them without one) are counted; the rest are only recorded.
    #[default]
    Count,

    /// Record the error and stop this worker
    Stop,

    /// Hand the error back to the caller. Meant for single-worker debugging.
    Rethrow,
}

/// Inclusive think-time range used in user simulation mode
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitRange {
    /// Shortest pause
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub min: Duration,

    /// Longest pause
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max: Duration,
}

impl WaitRange {
    /// Create a range from two durations
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// A fixed pause of `millis` milliseconds
    pub fn fixed(millis: u64) -> Self {
        let d = Duration::from_millis(millis);
        Self::new(d, d)
    }

    /// A pause between `min` and `max` milliseconds
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// Whether min and max coincide
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

/// Run settings
///
/// Exactly one of `number_of_executions` and `time_to_run` is the primary
/// stop condition. `max_number_of_executions` / `max_time_to_run` are
/// optional ceilings, each exclusive with its primary counterpart.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of concurrent workers (simulated users in user simulation mode)
    pub concurrency: usize,

    /// Benchmark or user simulation
    pub mode: BenchmarkMode,

    /// Total executions across all workers (primary)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_executions: Option<u64>,

    /// Run duration (primary)
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_run: Option<Duration>,

    /// No new execution starts once this many have completed (secondary)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_number_of_executions: Option<u64>,

    /// No new execution starts once the run is this old (secondary)
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time_to_run: Option<Duration>,

    /// Think time between executions; required iff mode is user simulation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_between_executions: Option<WaitRange>,

    /// Error handling policy
    pub exception_mode: ExceptionMode,

    /// Decides which errors are counted in COUNT mode (default: all)
    #[serde(skip)]
    pub error_classifier: Option<ErrorClassifier>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            mode: BenchmarkMode::Benchmark,
            number_of_executions: None,
            time_to_run: None,
            max_number_of_executions: None,
            max_time_to_run: None,
            wait_between_executions: None,
            exception_mode: ExceptionMode::Count,
            error_classifier: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("concurrency", &self.concurrency)
            .field("mode", &self.mode)
            .field("number_of_executions", &self.number_of_executions)
            .field("time_to_run", &self.time_to_run)
            .field("max_number_of_executions", &self.max_number_of_executions)
            .field("max_time_to_run", &self.max_time_to_run)
            .field("wait_between_executions", &self.wait_between_executions)
            .field("exception_mode", &self.exception_mode)
            .field("error_classifier", &self.error_classifier.is_some())
            .finish()
    }
}

impl Settings {
    /// Create settings with the given concurrency
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }

    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Set the total number of executions (primary)
    pub fn with_number_of_executions(mut self, n: u64) -> Self {
        self.number_of_executions = Some(n);
        self
    }

    /// Set the run duration (primary)
    pub fn with_time_to_run(mut self, d: Duration) -> Self {
        self.time_to_run = Some(d);
        self
    }

    /// Set the execution ceiling (secondary)
    pub fn with_max_number_of_executions(mut self, n: u64) -> Self {
        self.max_number_of_executions = Some(n);
        self
    }

    /// Set the duration ceiling (secondary)
    pub fn with_max_time_to_run(mut self, d: Duration) -> Self {
        self.max_time_to_run = Some(d);
        self
    }

    /// Switch to user simulation with the given think time
    pub fn with_user_simulation(mut self, wait: WaitRange) -> Self {
        self.mode = BenchmarkMode::UserSimulation;
        self.wait_between_executions = Some(wait);
        self
    }

    /// Set the exception mode
    pub fn with_exception_mode(mut self, mode: ExceptionMode) -> Self {
        self.exception_mode = mode;
        self
    }

    /// Set the COUNT mode classifier
    pub fn with_error_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.error_classifier = Some(classifier);
        self
    }

    /// Validate the settings
    ///
    /// Pure and deterministic; the first violated rule is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        match (self.number_of_executions, self.time_to_run) {
            (None, None) => return Err(ConfigError::MissingStopCondition),
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingLimits(
                    "number_of_executions and time_to_run are mutually exclusive".into(),
                ))
            }
            _ => {}
        }

        if self.time_to_run.is_some() && self.max_time_to_run.is_some() {
            return Err(ConfigError::ConflictingLimits(
                "time_to_run and max_time_to_run are mutually exclusive".into(),
            ));
        }

        if self.number_of_executions.is_some() && self.max_number_of_executions.is_some() {
            return Err(ConfigError::ConflictingLimits(
                "number_of_executions and max_number_of_executions are mutually exclusive".into(),
            ));
        }

        if self.number_of_executions == Some(0) {
            return Err(ConfigError::InvalidStopCondition(
                "number_of_executions must be at least 1".into(),
            ));
        }

        if self.max_number_of_executions == Some(0) {
            return Err(ConfigError::InvalidStopCondition(
                "max_number_of_executions must be at least 1".into(),
            ));
        }

        if self.max_time_to_run.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidStopCondition(
                "max_time_to_run must be a positive duration".into(),
            ));
        }

        match (self.mode, &self.wait_between_executions) {
            (BenchmarkMode::UserSimulation, None) => {
                return Err(ConfigError::WaitRangeMismatch(
                    "user simulation requires wait_between_executions".into(),
                ))
            }
            (BenchmarkMode::Benchmark, Some(_)) => {
                return Err(ConfigError::WaitRangeMismatch(
                    "wait_between_executions is only allowed in user simulation".into(),
                ))
            }
            _ => {}
        }

        if let Some(wait) = &self.wait_between_executions {
            if wait.min > wait.max {
                return Err(ConfigError::InvalidWaitRange(format!(
                    "min ({:?}) must not exceed max ({:?})",
                    wait.min, wait.max
                )));
            }
        }

        Ok(())
    }

    /// Validate and lower into a [`RunPlan`]
    pub fn plan(&self) -> Result<RunPlan, ConfigError> {
        self.validate()?;

        let primary = match (self.number_of_executions, self.time_to_run) {
            (Some(n), None) => PrimaryLimit::Executions(n),
            (None, Some(d)) => PrimaryLimit::Duration(d),
            _ => return Err(ConfigError::MissingStopCondition),
        };

        let secondary = match (self.max_number_of_executions, self.max_time_to_run) {
            (Some(n), None) => Some(SecondaryLimit::MaxExecutions(n)),
            (None, Some(d)) => Some(SecondaryLimit::MaxDuration(d)),
            (None, None) => None,
            // A primary limit always rules out one of the two ceilings
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingLimits(
                    "only one secondary limit may be set".into(),
                ))
            }
        };

        let pacing = match self.wait_between_executions {
            Some(wait) => Pacing::UserSimulation(wait),
            None => Pacing::Benchmark,
        };

        let exceptions = match self.exception_mode {
            ExceptionMode::Count => ExceptionPolicy::Count {
                classifier: self.error_classifier.clone(),
            },
            ExceptionMode::Stop => ExceptionPolicy::Stop,
            ExceptionMode::Rethrow => ExceptionPolicy::Rethrow,
        };

        Ok(RunPlan {
            concurrency: self.concurrency,
            primary,
            secondary,
            pacing,
            exceptions,
        })
    }
}

/// The intended end of a run, checked after every completed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryLimit {
    /// Stop once this many executions completed across all workers
    Executions(u64),

    /// Stop once the run is this old
    Duration(Duration),
}

/// A ceiling on starting new executions, checked before every execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryLimit {
    /// Completed executions across all workers
    MaxExecutions(u64),

    /// Time since the run began
    MaxDuration(Duration),
}

/// Whether workers pause between executions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Back-to-back executions
    Benchmark,

    /// Sampled think time between executions
    UserSimulation(WaitRange),
}

impl Pacing {
    /// The mode this pacing belongs to
    pub fn mode(&self) -> BenchmarkMode {
        match self {
            Pacing::Benchmark => BenchmarkMode::Benchmark,
            Pacing::UserSimulation(_) => BenchmarkMode::UserSimulation,
        }
    }
}

/// Resolved [`ExceptionMode`]
#[derive(Clone)]
pub enum ExceptionPolicy {
    /// Count (or just record) errors and continue
    Count {
        /// `None` counts every error
        classifier: Option<ErrorClassifier>,
    },

    /// Stop the worker on the first error
    Stop,

    /// Return the error from the worker
    Rethrow,
}

impl ExceptionPolicy {
    /// The mode this policy was built from
    pub fn mode(&self) -> ExceptionMode {
        match self {
            ExceptionPolicy::Count { .. } => ExceptionMode::Count,
            ExceptionPolicy::Stop => ExceptionMode::Stop,
            ExceptionPolicy::Rethrow => ExceptionMode::Rethrow,
        }
    }
}

impl fmt::Debug for ExceptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionPolicy::Count { classifier } => f
                .debug_struct("Count")
                .field("classifier", &classifier.is_some())
                .finish(),
            ExceptionPolicy::Stop => f.write_str("Stop"),
            ExceptionPolicy::Rethrow => f.write_str("Rethrow"),
        }
    }
}

/// Validated settings as seen by workers
#[derive(Debug, Clone)]
pub struct RunPlan {
    concurrency: usize,
    primary: PrimaryLimit,
    secondary: Option<SecondaryLimit>,
    pacing: Pacing,
    exceptions: ExceptionPolicy,
}

impl RunPlan {
    /// Number of workers
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Primary stop limit
    pub fn primary(&self) -> PrimaryLimit {
        self.primary
    }

    /// Optional secondary stop limit
    pub fn secondary(&self) -> Option<SecondaryLimit> {
        self.secondary
    }

    /// Pacing between executions
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Error handling policy
    pub fn exceptions(&self) -> &ExceptionPolicy {
        &self.exceptions
    }

    /// Benchmark or user simulation
    pub fn mode(&self) -> BenchmarkMode {
        self.pacing.mode()
    }

    /// Secondary duration ceiling, if that is the secondary limit
    pub fn max_duration(&self) -> Option<Duration> {
        match self.secondary {
            Some(SecondaryLimit::MaxDuration(d)) => Some(d),
            _ => None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Neither a primary count nor a primary duration was set
    #[error("Either number_of_executions or time_to_run must be set")]
    MissingStopCondition,

    /// Two limits that exclude each other were both set
    #[error("Conflicting limits: {0}")]
    ConflictingLimits(String),

    /// A limit has an out-of-range value
    #[error("Invalid stop condition: {0}")]
    InvalidStopCondition(String),

    /// Wait range presence does not match the mode
    #[error("Wait range does not match mode: {0}")]
    WaitRangeMismatch(String),

    /// Wait range bounds are inconsistent
    #[error("Invalid wait range: {0}")]
    InvalidWaitRange(String),

    /// Settings could not be parsed
    #[error("Invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}
