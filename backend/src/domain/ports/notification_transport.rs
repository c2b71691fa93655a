//! Port for external notification delivery (email, webhook, push).

use async_trait::async_trait;

use crate::domain::{DeliveryTarget, NotificationPayload};

use super::define_port_error;

define_port_error! {
    /// Errors raised by delivery transports.
    pub enum DeliveryError {
        /// The remote endpoint could not be reached.
        Transport { message: String } =>
            "notification transport failed: {message}",
        /// The remote endpoint answered with a failure status.
        Rejected { status: u16 } =>
            "notification rejected with status {status}",
        /// The target is malformed.
        InvalidTarget { message: String } =>
            "invalid notification target: {message}",
    }
}

/// Sends one payload to one target. A single attempt; no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver `payload` to `target`.
    async fn send(
        &self,
        target: &DeliveryTarget,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}
