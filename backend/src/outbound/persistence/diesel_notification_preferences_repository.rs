//! PostgreSQL-backed `NotificationPreferencesRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{
    NotificationPreferencesRepository, NotificationPreferencesRepositoryError,
};
use crate::domain::{NotificationPreferences, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::NotificationPreferencesRow;
use super::pool::DbPool;
use super::schema::notification_preferences;

/// Diesel-backed preferences reader.
#[derive(Clone)]
pub struct DieselNotificationPreferencesRepository {
    pool: DbPool,
}

impl DieselNotificationPreferencesRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationPreferencesRepository for DieselNotificationPreferencesRepository {
    async fn find_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|error| {
            map_pool_error(error, NotificationPreferencesRepositoryError::connection)
        })?;
        let row = notification_preferences::table
            .find(user.as_uuid())
            .select(NotificationPreferencesRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| {
                map_diesel_error(
                    error,
                    "load notification preferences",
                    NotificationPreferencesRepositoryError::query,
                    NotificationPreferencesRepositoryError::connection,
                )
            })?;
        row.map(NotificationPreferences::try_from)
            .transpose()
            .map_err(|err| NotificationPreferencesRepositoryError::query(err.to_string()))
    }
}
