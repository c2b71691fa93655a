//! Port for real-time delivery to connected sessions.

use async_trait::async_trait;

use crate::domain::NotificationPayload;

use super::define_port_error;

define_port_error! {
    /// Errors raised by live channel publishers.
    pub enum LiveChannelError {
        /// The pub/sub backend could not be reached.
        Connection { message: String } =>
            "live channel connection failed: {message}",
        /// The payload could not be published.
        Publish { message: String } =>
            "live channel publish failed: {message}",
    }
}

/// Publishes payloads onto named pub/sub channels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Publish `payload` on `channel`. Delivery to listeners is best effort.
    async fn publish(
        &self,
        channel: &str,
        payload: &NotificationPayload,
    ) -> Result<(), LiveChannelError>;
}
