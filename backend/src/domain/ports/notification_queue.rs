//! Port for handing notification events to the background fan-out.

use crate::domain::NotificationEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised when an event cannot be queued.
    pub enum NotificationQueueError {
        /// The queue is at capacity.
        Full => "notification queue is full",
        /// The consumer has shut down.
        Closed => "notification queue is closed",
    }
}

/// Non-blocking hand-off of events to the fan-out worker.
///
/// Implementations must return immediately; the caller's transaction never
/// waits on delivery.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationQueue: Send + Sync {
    /// Queue `event` for delivery.
    fn enqueue(&self, event: NotificationEvent) -> Result<(), NotificationQueueError>;
}
