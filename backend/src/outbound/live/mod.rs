//! Live channel adapters.
//!
//! Connected sessions listen on their canary's Redis channel. Without Redis
//! configured, payloads are logged and dropped; live delivery is best effort
//! either way.

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use tracing::debug;

use crate::domain::NotificationPayload;
use crate::domain::ports::{LiveChannel, LiveChannelError};

/// Redis pub/sub publisher backed by a `bb8` pool.
#[derive(Clone)]
pub struct RedisLiveChannel {
    pool: Pool<RedisConnectionManager>,
}

impl RedisLiveChannel {
    /// Connect to `redis_url`.
    ///
    /// # Errors
    ///
    /// [`LiveChannelError::Connection`] when the URL is invalid or the pool
    /// cannot be built.
    pub async fn connect(redis_url: &str) -> Result<Self, LiveChannelError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|err| LiveChannelError::connection(err.to_string()))?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(|err| LiveChannelError::connection(err.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl LiveChannel for RedisLiveChannel {
    async fn publish(
        &self,
        channel: &str,
        payload: &NotificationPayload,
    ) -> Result<(), LiveChannelError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| LiveChannelError::publish(format!("encode payload: {err}")))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| LiveChannelError::connection(err.to_string()))?;
        let receivers: i64 = conn
            .publish(channel, body)
            .await
            .map_err(|err| LiveChannelError::publish(err.to_string()))?;
        debug!(%channel, receivers, "live payload published");
        Ok(())
    }
}

/// Live channel used when no pub/sub backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLiveChannel;

#[async_trait]
impl LiveChannel for LoggingLiveChannel {
    async fn publish(
        &self,
        channel: &str,
        payload: &NotificationPayload,
    ) -> Result<(), LiveChannelError> {
        debug!(
            %channel,
            kind = ?payload.kind,
            canary_id = %payload.canary_id,
            "live channel disabled; payload dropped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn invalid_redis_url_is_a_connection_error() {
        let result = RedisLiveChannel::connect("not a url").await;
        assert!(matches!(result, Err(LiveChannelError::Connection { .. })));
    }
}
