//! Error types for stampede-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::traits::TestError;

/// Core error type
#[derive(Error, Debug)]
pub enum BenchError {
    /// Settings failed validation; raised before any worker starts
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required builder field was never set
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// The unit of work failed in RETHROW mode
    #[error("worker {worker_id} rethrew test error: {error:#}")]
    Rethrown {
        /// Index of the worker whose test failed
        worker_id: usize,
        /// The error raised by the test
        error: TestError,
    },

    /// A worker thread panicked or went away without reporting
    #[error("worker error: {0}")]
    Worker(String),

    /// IO error (e.g. spawning a worker thread)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Shorthand for [`BenchError::MissingConfig`]
    pub fn missing_config(field: &'static str) -> Self {
        BenchError::MissingConfig(field)
    }

    /// Shorthand for [`BenchError::Worker`]
    pub fn worker(message: impl Into<String>) -> Self {
        BenchError::Worker(message.into())
    }

    /// Shorthand for [`BenchError::Rethrown`]
    pub fn rethrown(worker_id: usize, error: TestError) -> Self {
        BenchError::Rethrown { worker_id, error }
    }

    /// Returns `true` for errors raised by settings validation
    pub fn is_config(&self) -> bool {
        matches!(self, BenchError::Config(_) | BenchError::MissingConfig(_))
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
