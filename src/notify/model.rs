//! Notification messages exchanged over the WebSocket channel.

use serde::{Deserialize, Serialize};

use crate::tasks::{TaskId, TaskStatus};

/// Outcome reported in a `process-result` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Completed,
    Error,
}

/// A task reached a terminal state. Broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: TaskId,
    pub status: ResultStatus,
    /// Result text on success, error message on failure.
    pub result: String,
}

impl TaskEvent {
    pub fn completed(id: TaskId, result: impl Into<String>) -> Self {
        Self {
            id,
            status: ResultStatus::Completed,
            result: result.into(),
        }
    }

    pub fn failed(id: TaskId, error: impl Into<String>) -> Self {
        Self {
            id,
            status: ResultStatus::Error,
            result: error.into(),
        }
    }
}

/// Messages a client sends over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientAction {
    /// Start processing an admitted task.
    ProcessRequest { id: TaskId },
    /// Admit a new task (same as `POST /process`).
    SubmitTask,
}

/// Messages the server sends over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A task finished (broadcast).
    ProcessResult(TaskEvent),
    /// Acknowledges a `submit-task` (sent to the submitting client only).
    TaskAccepted { id: TaskId, status: TaskStatus },
    /// A client action was refused (sent to that client only).
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<TaskId>,
        message: String,
    },
}
