//! Notifications — task result events and their fan-out to subscribers.

pub mod broadcaster;
pub mod model;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription};
pub use model::{ClientAction, ResultStatus, ServerMessage, TaskEvent};
