//! Port for reading users' notification preferences.

use async_trait::async_trait;

use crate::domain::{NotificationPreferences, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification preference adapters.
    pub enum NotificationPreferencesRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "notification preferences connection failed: {message}",
        /// Query failed or stored data could not be decoded.
        Query { message: String } =>
            "notification preferences query failed: {message}",
    }
}

/// Read-side port used by the fan-out pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPreferencesRepository: Send + Sync {
    /// Preferences of `user`; `None` when nothing was configured.
    async fn find_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError>;
}
