//! Task executors — the work a dispatched worker actually performs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::error::WorkerError;
use crate::tasks::{TaskId, TaskPayload};

/// Performs the work for one task and reports exactly one outcome.
///
/// Implementations run inside an isolated tokio task; a panic is reported to
/// the dispatcher as a crash rather than propagating.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, id: &TaskId, payload: &TaskPayload) -> Result<String, WorkerError>;
}

/// Default executor: waits for a fixed delay, then reports a result string.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, id: &TaskId, _payload: &TaskPayload) -> Result<String, WorkerError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!(
            "Processed result for request {} at {}",
            id,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        ))
    }
}
