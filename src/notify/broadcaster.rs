//! Broadcaster — fan-out of task events to connected subscribers.
//!
//! Backed by a `tokio::sync::broadcast` channel. A broadcast never waits on a
//! subscriber: one that falls more than the channel capacity behind sees
//! `RecvError::Lagged` and skips ahead, without affecting the others.

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::model::TaskEvent;

/// Default broadcast channel capacity.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Handle identifying one subscription.
pub type SubscriberId = Uuid;

/// Receiving end of a subscription. Dropping it unsubscribes.
pub struct Subscription {
    pub id: SubscriberId,
    rx: broadcast::Receiver<TaskEvent>,
}

impl Subscription {
    /// Next event. `Lagged(n)` reports events skipped for a slow reader;
    /// `Closed` means the broadcaster is gone.
    pub async fn recv(&mut self) -> Result<TaskEvent, broadcast::error::RecvError> {
        self.rx.recv().await
    }
}

/// Delivers task events to every currently connected subscriber.
pub struct Broadcaster {
    tx: broadcast::Sender<TaskEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a subscriber. Only events broadcast after this call are seen.
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        debug!(subscriber = %id, "Subscriber registered");
        Subscription {
            id,
            rx: self.tx.subscribe(),
        }
    }

    /// Remove a subscriber. Consuming the subscription makes a second
    /// removal impossible.
    pub fn unsubscribe(&self, subscription: Subscription) {
        debug!(subscriber = %subscription.id, "Subscriber removed");
        drop(subscription);
    }

    /// Send an event to all subscribers. Returns how many were subscribed.
    pub fn broadcast(&self, event: TaskEvent) -> usize {
        let task_id = event.id.clone();
        // Err only means nobody is listening.
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!(task_id = %task_id, delivered, "Event broadcast");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use crate::notify::model::ResultStatus;
    use crate::tasks::TaskId;

    fn event(id: &str) -> TaskEvent {
        TaskEvent::completed(TaskId::from(id), "ok")
    }

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber_once() {
        let broadcaster = Broadcaster::default();
        let mut subs = vec![
            broadcaster.subscribe(),
            broadcaster.subscribe(),
            broadcaster.subscribe(),
        ];

        assert_eq!(broadcaster.broadcast(event("t1")), 3);

        for sub in subs.iter_mut() {
            let got = sub.recv().await.unwrap();
            assert_eq!(got.id.as_str(), "t1");
            assert_eq!(got.status, ResultStatus::Completed);
            // Exactly one.
            assert!(
                tokio::time::timeout(Duration::from_millis(20), sub.recv())
                    .await
                    .is_err()
            );
        }
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_replay() {
        let broadcaster = Broadcaster::default();
        broadcaster.broadcast(event("early"));

        let mut late = broadcaster.subscribe();
        broadcaster.broadcast(event("after"));

        assert_eq!(late.recv().await.unwrap().id.as_str(), "after");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let broadcaster = Broadcaster::default();
        let sub = broadcaster.subscribe();
        let mut other = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.unsubscribe(sub);

        assert_eq!(broadcaster.subscriber_count(), 1);
        assert_eq!(broadcaster.broadcast(event("t1")), 1);
        assert_eq!(other.recv().await.unwrap().id.as_str(), "t1");
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_block_others() {
        let broadcaster = Broadcaster::new(1);
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();

        broadcaster.broadcast(event("t1"));
        assert_eq!(fast.recv().await.unwrap().id.as_str(), "t1");

        // The slow subscriber never read t1; t2 overwrites it.
        broadcaster.broadcast(event("t2"));
        assert_eq!(fast.recv().await.unwrap().id.as_str(), "t2");

        assert!(matches!(slow.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(slow.recv().await.unwrap().id.as_str(), "t2");
    }

    #[tokio::test]
    async fn dropped_subscription_is_not_counted() {
        let broadcaster = Broadcaster::default();
        let sub = broadcaster.subscribe();
        drop(sub);

        assert_eq!(broadcaster.broadcast(event("t1")), 0);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
