//! Error types for task-relay.

use std::time::Duration;

use crate::tasks::{TaskId, TaskStatus};

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by a task queue backend.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Task {id} already exists")]
    DuplicateId { id: TaskId },

    #[error("Task {id} not found")]
    NotFound { id: TaskId },

    #[error("Task {id} is {from}, cannot transition to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Failure reported by (or about) an isolated worker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("{0}")]
    Execution(String),

    #[error("Worker crashed: {reason}")]
    Crashed { reason: String },

    #[error("Worker timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
}

/// Reasons a dispatch request is refused.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Task {id} is {status}, only pending tasks can be dispatched")]
    NotPending { id: TaskId, status: TaskStatus },

    #[error("Task {id} already has an active worker")]
    AlreadyActive { id: TaskId },

    #[error("Maximum concurrent workers ({max}) reached")]
    AtCapacity { max: usize },

    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
