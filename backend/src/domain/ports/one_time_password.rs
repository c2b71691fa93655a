//! Port for second-factor validation owned by the authentication service.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by one-time password validators.
    pub enum OneTimePasswordError {
        /// The code was wrong, expired, or already used.
        Invalid => "one-time password rejected",
        /// The validator could not be reached.
        Unavailable { message: String } =>
            "one-time password validator unavailable: {message}",
    }
}

/// Validates a freshly entered one-time password for a user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OneTimePasswordValidator: Send + Sync {
    /// Succeed only when `code` is currently valid for `user`.
    async fn validate(&self, user: &UserId, code: &str) -> Result<(), OneTimePasswordError>;
}
