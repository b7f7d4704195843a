//! Worker system — isolated task execution.
//!
//! Core components:
//! - `executor` — the `TaskExecutor` trait and the default simulated executor
//! - `dispatcher` — one worker per task, outcome routing, shutdown

pub mod dispatcher;
pub mod executor;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use executor::{SimulatedExecutor, TaskExecutor};
