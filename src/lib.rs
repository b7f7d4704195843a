//! task-relay — asynchronous task queue with push notifications.

pub mod admission;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod queue;
pub mod tasks;
pub mod worker;
