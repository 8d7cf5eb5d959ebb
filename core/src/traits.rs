//! Callback types at the engine boundary
//!
//! The engine never looks inside the unit of work. It only needs three
//! callables, all of which may be invoked concurrently from every worker:
//!
//! - the test itself ([`TestFn`]), which signals failure by returning `Err`
//! - an optional [`ExecutionCondition`] consulted before every iteration
//! - an optional [`ErrorClassifier`] deciding whether a failure is counted

use std::sync::Arc;

use serde::Serializer;

/// The unit of work: zero arguments, fails by returning an error
pub type TestFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Returns `false` to stop a worker before its next iteration
pub type ExecutionCondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Returns `true` if the error should be counted (COUNT mode only)
pub type ErrorClassifier = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// An error raised by the test, shared between worker records and the aggregate
pub type TestError = Arc<anyhow::Error>;

/// Wrap a closure as a [`TestFn`]
pub fn test_fn<F>(f: F) -> TestFn
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as an [`ExecutionCondition`]
pub fn execution_condition<F>(f: F) -> ExecutionCondition
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as an [`ErrorClassifier`]
pub fn error_classifier<F>(f: F) -> ErrorClassifier
where
    F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Serialize an optional test error as its display chain
pub(crate) fn serialize_test_error<S>(
    error: &Option<TestError>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&format!("{e:#}")),
        None => serializer.serialize_none(),
    }
}
