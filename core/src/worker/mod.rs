//! Worker module for running the unit of work
//!
//! A Worker is one OS thread running the loop
//! **check stop conditions -> execute -> record -> (pause) -> repeat**.
//!
//! Workers share only two things: the completed-execution counter and the run
//! clock, both held in [`RunState`](crate::state::RunState). Everything else a
//! worker touches (its timer, its think-time sampler, its [`WorkerResult`]) is
//! private, and the result is handed to the orchestrator by value when the
//! loop exits.
//!
//! # Example
//!
//! ```ignore
//! use stampede_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .test(test)
//!     .plan(Arc::new(settings.plan()?))
//!     .state(Arc::new(RunState::start(Box::new(Stopwatch::new()))))
//!     .build()?;
//!
//! let result = worker.run()?;
//! println!("Completed: {}", result.completed_executions);
//! ```

mod builder;
mod executor;
mod result;
mod think_time;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use result::{StopReason, WorkerResult};
pub use think_time::ThinkTime;

#[cfg(test)]
mod tests;
