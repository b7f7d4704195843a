//! Task data model — identifiers, lifecycle states, and the task record.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of the random suffix appended to generated ids.
const ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque task identifier, assigned once at admission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh id: `req_<unix millis>_<9 base36 chars>`.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("req_{}_{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, waiting for a worker.
    Pending,
    /// A worker has been assigned.
    Processing,
    /// Worker reported a result.
    Completed,
    /// Worker reported an error or crashed.
    Failed,
}

impl TaskStatus {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Data handed to a worker along with the task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// When the submission was received.
    pub timestamp: DateTime<Utc>,
}

impl TaskPayload {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// One unit of work and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub payload: TaskPayload,
    /// Set only when the task completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Set only when the task failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a new pending record.
    pub fn new(id: TaskId, payload: TaskPayload) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            submitted_at: Utc::now(),
            payload,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Transition to processing.
    ///
    /// On refusal the current status is returned unchanged.
    pub fn start(&mut self) -> Result<(), TaskStatus> {
        self.transition_to(TaskStatus::Processing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to completed and record the result.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<(), TaskStatus> {
        self.transition_to(TaskStatus::Completed)?;
        self.result = Some(result.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to failed and record the error.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TaskStatus> {
        self.transition_to(TaskStatus::Failed)?;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn transition_to(&mut self, target: TaskStatus) -> Result<(), TaskStatus> {
        if !self.status.can_transition_to(target) {
            return Err(self.status);
        }
        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn state_transitions_valid() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Processing));
        assert!(TaskStatus::Processing.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Processing.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Processing.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Processing));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = TaskId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "req");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<TaskId> = (0..10_000).map(|_| TaskId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn record_lifecycle_sets_result() {
        let mut record = TaskRecord::new(TaskId::from("t1"), TaskPayload::now());
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.result.is_none() && record.error.is_none());

        record.start().unwrap();
        assert_eq!(record.status, TaskStatus::Processing);
        assert!(record.started_at.is_some());
        assert!(record.result.is_none() && record.error.is_none());

        record.complete("done").unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("done"));
        assert!(record.error.is_none());
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn terminal_record_rejects_further_transitions() {
        let mut record = TaskRecord::new(TaskId::from("t1"), TaskPayload::now());
        record.start().unwrap();
        record.fail("boom").unwrap();

        assert_eq!(record.complete("late"), Err(TaskStatus::Failed));
        assert_eq!(record.fail("again"), Err(TaskStatus::Failed));
        assert_eq!(record.start(), Err(TaskStatus::Failed));
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert!(record.result.is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn task_id_serializes_as_plain_string() {
        let id = TaskId::from("req_1_abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"req_1_abc\"");
    }
}
