//! Bounded in-process notification queue and its fan-out worker.
//!
//! Request handlers enqueue without waiting; the worker drains the channel
//! and spawns one fan-out task per event so a slow recipient never holds up
//! the next event. Events still queued at shutdown are dropped.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::{NotificationQueue, NotificationQueueError};
use crate::domain::{NotificationDispatcher, NotificationEvent};

/// Producer side of the queue.
#[derive(Clone)]
pub struct ChannelNotificationQueue {
    sender: mpsc::Sender<NotificationEvent>,
}

/// Consumer side of the queue, handed to [`spawn_fanout_worker`].
pub struct NotificationReceiver {
    receiver: mpsc::Receiver<NotificationEvent>,
}

/// Create a queue holding at most `capacity` pending events.
///
/// # Examples
///
/// ```
/// use canary_backend::outbound::queue::notification_channel;
///
/// let (queue, _receiver) = notification_channel(16);
/// # drop(queue);
/// ```
pub fn notification_channel(capacity: usize) -> (ChannelNotificationQueue, NotificationReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        ChannelNotificationQueue { sender },
        NotificationReceiver { receiver },
    )
}

impl NotificationQueue for ChannelNotificationQueue {
    fn enqueue(&self, event: NotificationEvent) -> Result<(), NotificationQueueError> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => NotificationQueueError::full(),
            TrySendError::Closed(_) => NotificationQueueError::closed(),
        })
    }
}

/// Drain the queue until every producer is dropped.
pub fn spawn_fanout_worker(
    receiver: NotificationReceiver,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> JoinHandle<()> {
    let NotificationReceiver { mut receiver } = receiver;
    tokio::spawn(async move {
        info!("notification fan-out worker started");
        while let Some(event) = receiver.recv().await {
            let dispatcher = Arc::clone(&dispatcher);
            debug!(canary_id = %event.canary_id, kind = ?event.kind, "event dequeued");
            let task = tokio::spawn(async move { dispatcher.dispatch(&event).await });
            tokio::spawn(async move {
                if let Err(error) = task.await {
                    warn!(%error, "notification fan-out task aborted");
                }
            });
        }
        info!("notification fan-out worker stopped");
    })
}
