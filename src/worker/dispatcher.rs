//! Worker dispatcher — one isolated worker per dispatched task.
//!
//! `dispatch()` marks the task processing and spawns two tokio tasks: the
//! worker, which runs the executor, and a supervisor, which awaits the worker
//! and routes its outcome to the queue and the broadcaster. Both are tracked
//! under the task id until the supervisor finishes or `shutdown_all()` aborts
//! them.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::executor::TaskExecutor;
use crate::error::{DispatchError, QueueError, WorkerError};
use crate::notify::{Broadcaster, TaskEvent};
use crate::queue::TaskQueue;
use crate::tasks::{TaskId, TaskStatus};

/// Dispatcher limits.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Upper bound on concurrently running workers (None = unbounded).
    pub max_concurrent_workers: Option<usize>,
    /// Per-task deadline (None = no deadline).
    pub task_timeout: Option<Duration>,
}

/// Abort handles for one in-flight task.
struct ActiveWorker {
    worker: AbortHandle,
    supervisor: AbortHandle,
}

impl ActiveWorker {
    fn abort(&self) {
        self.supervisor.abort();
        self.worker.abort();
    }
}

/// `None` marks an id reserved by a dispatch that has not spawned yet.
type ActiveTable = Arc<RwLock<HashMap<TaskId, Option<ActiveWorker>>>>;

/// Bounded worker pool.
struct Limiter {
    permits: Arc<Semaphore>,
    max: usize,
}

/// Assigns workers to pending tasks and routes their outcomes.
pub struct Dispatcher {
    queue: Arc<dyn TaskQueue>,
    broadcaster: Arc<Broadcaster>,
    executor: Arc<dyn TaskExecutor>,
    active: ActiveTable,
    limiter: Option<Limiter>,
    task_timeout: Option<Duration>,
    shutting_down: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        broadcaster: Arc<Broadcaster>,
        executor: Arc<dyn TaskExecutor>,
        config: DispatcherConfig,
    ) -> Self {
        let limiter = config.max_concurrent_workers.map(|max| Limiter {
            permits: Arc::new(Semaphore::new(max)),
            max,
        });

        Self {
            queue,
            broadcaster,
            executor,
            active: Arc::new(RwLock::new(HashMap::new())),
            limiter,
            task_timeout: config.task_timeout,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Start a worker for a pending task.
    ///
    /// Returns once the worker is spawned; the outcome arrives later as a
    /// broadcast event.
    pub async fn dispatch(&self, id: &TaskId) -> Result<(), DispatchError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(DispatchError::ShuttingDown);
        }

        // Reserve the id under a short lock; queue calls run without it.
        {
            let mut active = self.active.write().await;
            if active.contains_key(id) {
                return Err(DispatchError::AlreadyActive { id: id.clone() });
            }
            active.insert(id.clone(), None);
        }

        let handles = match self.start(id).await {
            Ok(handles) => handles,
            Err(e) => {
                self.active.write().await.remove(id);
                return Err(e);
            }
        };

        let mut active = self.active.write().await;
        let registered = match active.get_mut(id) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handles);
                true
            }
            // Reservation gone: drained by shutdown_all, or the supervisor
            // already finished and deregistered.
            _ => {
                handles.abort();
                false
            }
        };

        if !registered && self.shutting_down.load(Ordering::Acquire) {
            warn!(task_id = %id, "Dispatch raced with shutdown, worker aborted");
            return Err(DispatchError::ShuttingDown);
        }

        info!(task_id = %id, active = active.len(), "Task dispatched");
        Ok(())
    }

    /// Validate the task, take a permit, mark it processing and spawn.
    async fn start(&self, id: &TaskId) -> Result<ActiveWorker, DispatchError> {
        let record = self.queue.get(id).await?;
        if record.status != TaskStatus::Pending {
            return Err(DispatchError::NotPending {
                id: id.clone(),
                status: record.status,
            });
        }

        let permit = match &self.limiter {
            Some(limiter) => Some(
                Arc::clone(&limiter.permits)
                    .try_acquire_owned()
                    .map_err(|_| DispatchError::AtCapacity { max: limiter.max })?,
            ),
            None => None,
        };

        self.queue.mark_processing(id).await?;

        let worker: JoinHandle<Result<String, WorkerError>> = {
            let executor = Arc::clone(&self.executor);
            let id = id.clone();
            let payload = record.payload;
            tokio::spawn(async move { executor.execute(&id, &payload).await })
        };
        let worker_abort = worker.abort_handle();

        let supervisor = tokio::spawn(supervise(
            id.clone(),
            worker,
            Arc::clone(&self.queue),
            Arc::clone(&self.broadcaster),
            Arc::clone(&self.active),
            self.task_timeout,
            permit,
        ));

        Ok(ActiveWorker {
            worker: worker_abort,
            supervisor: supervisor.abort_handle(),
        })
    }

    /// Refuse further dispatches and abort every active worker without
    /// waiting for completion.
    ///
    /// Aborted tasks stay `processing` and no event is broadcast for them.
    /// Returns the number of workers aborted.
    pub async fn shutdown_all(&self) -> usize {
        self.shutting_down.store(true, Ordering::Release);

        let mut active = self.active.write().await;
        let mut count = 0;
        for (id, slot) in active.drain() {
            if let Some(handles) = slot {
                handles.abort();
                count += 1;
                debug!(task_id = %id, "Worker aborted");
            }
        }

        if count > 0 {
            warn!(count, "Aborted in-flight workers on shutdown");
        }
        count
    }

    /// Whether a worker is assigned (or being assigned) to this task.
    pub async fn is_active(&self, id: &TaskId) -> bool {
        self.active.read().await.contains_key(id)
    }

    /// Number of in-flight workers.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}

/// Await one worker and route its outcome.
async fn supervise(
    id: TaskId,
    mut worker: JoinHandle<Result<String, WorkerError>>,
    queue: Arc<dyn TaskQueue>,
    broadcaster: Arc<Broadcaster>,
    active: ActiveTable,
    task_timeout: Option<Duration>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let joined = match task_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, &mut worker).await {
            Ok(joined) => joined,
            Err(_) => {
                worker.abort();
                warn!(task_id = %id, ?timeout, "Worker exceeded deadline");
                Ok(Err(WorkerError::TimedOut { timeout }))
            }
        },
        None => worker.await,
    };

    let outcome = match joined {
        Ok(outcome) => Some(outcome),
        Err(e) if e.is_cancelled() => None,
        Err(e) => Some(Err(crash_reason(e))),
    };

    match outcome {
        Some(Ok(result)) => {
            info!(task_id = %id, "Task completed");
            if record_terminal(&id, queue.complete(&id, result.clone()).await) {
                broadcaster.broadcast(TaskEvent::completed(id.clone(), result));
            }
        }
        Some(Err(err)) => {
            let message = err.to_string();
            warn!(task_id = %id, error = %message, "Task failed");
            if record_terminal(&id, queue.fail(&id, message.clone()).await) {
                broadcaster.broadcast(TaskEvent::failed(id.clone(), message));
            }
        }
        None => debug!(task_id = %id, "Worker cancelled before reporting"),
    }

    drop(permit);
    active.write().await.remove(&id);
}

/// Log a rejected terminal transition. Returns whether the transition applied.
fn record_terminal(id: &TaskId, result: Result<(), QueueError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e @ QueueError::InvalidTransition { .. }) => {
            warn!(task_id = %id, error = %e, "Ignoring duplicate terminal report");
            false
        }
        Err(e) => {
            error!(task_id = %id, error = %e, "Failed to record task outcome");
            false
        }
    }
}

fn crash_reason(err: JoinError) -> WorkerError {
    let reason = match err.try_into_panic() {
        Ok(panic) => panic_message(panic),
        Err(err) => err.to_string(),
    };
    WorkerError::Crashed { reason }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
