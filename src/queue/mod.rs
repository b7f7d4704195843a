//! Task queue — the authoritative store of task status.
//!
//! Everything outside this module depends on the [`TaskQueue`] trait only;
//! the concrete backend is chosen once at startup by [`create_queue`].

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ConfigError, QueueError};
use crate::tasks::{TaskId, TaskPayload, TaskRecord, TaskStatus};

pub use memory::InMemoryQueue;

/// Number of tasks in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Backend-agnostic task queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Acquire backend resources. Called once at startup.
    async fn initialize(&self) -> Result<(), QueueError>;

    /// Release backend resources. Called once at shutdown.
    async fn cleanup(&self) -> Result<(), QueueError>;

    /// Insert a new pending task.
    async fn enqueue(&self, id: TaskId, payload: TaskPayload) -> Result<(), QueueError>;

    /// Current status of a task.
    async fn get_status(&self, id: &TaskId) -> Result<TaskStatus, QueueError>;

    /// Snapshot of the full task record.
    async fn get(&self, id: &TaskId) -> Result<TaskRecord, QueueError>;

    /// Move a pending task to processing.
    async fn mark_processing(&self, id: &TaskId) -> Result<(), QueueError>;

    /// Move a processing task to completed.
    async fn complete(&self, id: &TaskId, result: String) -> Result<(), QueueError>;

    /// Move a processing task to failed.
    async fn fail(&self, id: &TaskId, error: String) -> Result<(), QueueError>;

    /// Per-status counts.
    async fn counts(&self) -> QueueCounts;
}

/// Available queue backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// Process-local hash table; nothing survives a restart.
    Memory,
}

impl std::str::FromStr for QueueBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "queue_backend".to_string(),
                message: format!("unknown queue backend: {other}"),
            }),
        }
    }
}

impl std::fmt::Display for QueueBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Build the queue for the selected backend.
pub fn create_queue(backend: QueueBackend) -> Arc<dyn TaskQueue> {
    match backend {
        QueueBackend::Memory => Arc::new(InMemoryQueue::new()),
    }
}
