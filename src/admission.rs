//! Admission — accept a submission, assign an id, enqueue, acknowledge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::tasks::{TaskId, TaskPayload, TaskStatus};

/// Immediate acknowledgement returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionAck {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// Admits new tasks into the queue without waiting for execution.
#[derive(Clone)]
pub struct Admission {
    queue: Arc<dyn TaskQueue>,
}

impl Admission {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    /// Admit a task under a freshly generated id.
    pub async fn admit(&self) -> Result<AdmissionAck, QueueError> {
        self.admit_with_id(TaskId::generate()).await
    }

    /// Admit a task under a caller-chosen id.
    pub async fn admit_with_id(&self, id: TaskId) -> Result<AdmissionAck, QueueError> {
        let payload = TaskPayload::now();
        if let Err(e) = self.queue.enqueue(id.clone(), payload).await {
            error!(task_id = %id, error = %e, "Admission failed");
            return Err(e);
        }

        info!(task_id = %id, "Task admitted");
        Ok(AdmissionAck {
            id,
            status: TaskStatus::Pending,
        })
    }
}
