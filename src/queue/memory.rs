//! In-memory task queue backed by a hash table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{QueueCounts, TaskQueue};
use crate::error::QueueError;
use crate::tasks::{TaskId, TaskPayload, TaskRecord, TaskStatus};

/// Task table held in process memory. Records are kept for the lifetime of
/// the process.
#[derive(Default)]
pub struct InMemoryQueue {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a transition to one record under the write lock.
    async fn transition(
        &self,
        id: &TaskId,
        target: TaskStatus,
        apply: impl FnOnce(&mut TaskRecord) -> Result<(), TaskStatus>,
    ) -> Result<(), QueueError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound { id: id.clone() })?;

        apply(record).map_err(|from| QueueError::InvalidTransition {
            id: id.clone(),
            from,
            to: target,
        })?;

        debug!(task_id = %id, status = %target, "Task transitioned");
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn initialize(&self) -> Result<(), QueueError> {
        self.tasks.write().await.clear();
        info!("In-memory queue initialized");
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), QueueError> {
        let mut tasks = self.tasks.write().await;
        let dropped = tasks.len();
        tasks.clear();
        info!(dropped, "In-memory queue cleaned up");
        Ok(())
    }

    async fn enqueue(&self, id: TaskId, payload: TaskPayload) -> Result<(), QueueError> {
        let mut tasks = self.tasks.write().await;
        match tasks.entry(id) {
            Entry::Occupied(entry) => Err(QueueError::DuplicateId {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(task_id = %entry.key(), "Task enqueued");
                let record = TaskRecord::new(entry.key().clone(), payload);
                entry.insert(record);
                Ok(())
            }
        }
    }

    async fn get_status(&self, id: &TaskId) -> Result<TaskStatus, QueueError> {
        self.tasks
            .read()
            .await
            .get(id)
            .map(|r| r.status)
            .ok_or_else(|| QueueError::NotFound { id: id.clone() })
    }

    async fn get(&self, id: &TaskId) -> Result<TaskRecord, QueueError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound { id: id.clone() })
    }

    async fn mark_processing(&self, id: &TaskId) -> Result<(), QueueError> {
        self.transition(id, TaskStatus::Processing, |r| r.start())
            .await
    }

    async fn complete(&self, id: &TaskId, result: String) -> Result<(), QueueError> {
        self.transition(id, TaskStatus::Completed, |r| r.complete(result))
            .await
    }

    async fn fail(&self, id: &TaskId, error: String) -> Result<(), QueueError> {
        self.transition(id, TaskStatus::Failed, |r| r.fail(error))
            .await
    }

    async fn counts(&self) -> QueueCounts {
        let tasks = self.tasks.read().await;
        let mut counts = QueueCounts::default();
        for record in tasks.values() {
            match record.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
