//! Service wiring — builds the queue, broadcaster, dispatcher, and admission
//! services once and tears them down once.

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::admission::Admission;
use crate::api::{self, AppState};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::notify::Broadcaster;
use crate::queue::{TaskQueue, create_queue};
use crate::worker::{Dispatcher, DispatcherConfig, SimulatedExecutor, TaskExecutor};

/// Process-wide services, constructed explicitly and shared by reference.
pub struct App {
    pub config: ServiceConfig,
    pub queue: Arc<dyn TaskQueue>,
    pub broadcaster: Arc<Broadcaster>,
    pub dispatcher: Arc<Dispatcher>,
    pub admission: Admission,
}

impl App {
    /// Build with the default simulated executor.
    pub async fn build(config: ServiceConfig) -> Result<Self> {
        let executor = Arc::new(SimulatedExecutor::new(config.work_delay));
        Self::with_executor(config, executor).await
    }

    /// Build with a caller-supplied executor.
    pub async fn with_executor(
        config: ServiceConfig,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self> {
        let queue = create_queue(config.queue_backend);
        queue.initialize().await?;

        let broadcaster = Arc::new(Broadcaster::new(config.subscriber_buffer));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&broadcaster),
            executor,
            DispatcherConfig {
                max_concurrent_workers: config.max_concurrent_workers,
                task_timeout: config.task_timeout,
            },
        ));
        let admission = Admission::new(Arc::clone(&queue));

        info!(
            backend = %config.queue_backend,
            max_workers = ?config.max_concurrent_workers,
            task_timeout = ?config.task_timeout,
            "Services initialized"
        );

        Ok(Self {
            config,
            queue,
            broadcaster,
            dispatcher,
            admission,
        })
    }

    /// Shared handler state.
    pub fn state(&self) -> AppState {
        AppState {
            admission: self.admission.clone(),
            queue: Arc::clone(&self.queue),
            broadcaster: Arc::clone(&self.broadcaster),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    /// HTTP + WebSocket router.
    pub fn router(&self) -> Router {
        api::routes(self.state())
    }

    /// Abort in-flight workers, then release queue resources.
    pub async fn shutdown(&self) -> Result<()> {
        let aborted = self.dispatcher.shutdown_all().await;
        self.queue.cleanup().await?;
        info!(aborted, "Services shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tasks::TaskStatus;

    fn fast_config() -> ServiceConfig {
        ServiceConfig {
            work_delay: Duration::from_millis(10),
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_through_services() {
        let app = App::build(fast_config()).await.unwrap();
        let mut sub = app.broadcaster.subscribe();

        let ack = app.admission.admit().await.unwrap();
        app.dispatcher.dispatch(&ack.id).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.id, ack.id);
        assert!(event.result.starts_with(&format!("Processed result for request {}", ack.id)));
        assert_eq!(app.queue.get_status(&ack.id).await.unwrap(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn shutdown_clears_queue() {
        let app = App::build(fast_config()).await.unwrap();
        let ack = app.admission.admit().await.unwrap();

        app.shutdown().await.unwrap();
        assert!(app.queue.get_status(&ack.id).await.is_err());
    }
}
