//! Task records and their lifecycle.

pub mod model;

pub use model::{TaskId, TaskPayload, TaskRecord, TaskStatus};
