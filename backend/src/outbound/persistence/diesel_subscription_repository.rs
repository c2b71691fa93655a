//! PostgreSQL-backed `SubscriptionRepository`.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{SubscriptionRepository, SubscriptionRepositoryError};
use crate::domain::{CanaryId, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::pool::{DbPool, PoolError};
use super::schema::canary_subscriptions;

/// Diesel-backed subscription store.
#[derive(Clone)]
pub struct DieselSubscriptionRepository {
    pool: DbPool,
}

impl DieselSubscriptionRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> SubscriptionRepositoryError {
    map_pool_error(error, SubscriptionRepositoryError::connection)
}

fn diesel_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> SubscriptionRepositoryError {
    move |error| {
        map_diesel_error(
            error,
            operation,
            SubscriptionRepositoryError::query,
            SubscriptionRepositoryError::connection,
        )
    }
}

#[async_trait]
impl SubscriptionRepository for DieselSubscriptionRepository {
    async fn subscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(canary_subscriptions::table)
            .values((
                canary_subscriptions::user_id.eq(subscriber.as_uuid()),
                canary_subscriptions::canary_id.eq(canary_id.as_uuid()),
            ))
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(diesel_error("subscribe"))?;
        Ok(())
    }

    async fn unsubscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::delete(canary_subscriptions::table.find((subscriber.as_uuid(), canary_id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(diesel_error("unsubscribe"))?;
        Ok(())
    }

    async fn is_subscribed(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<bool, SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::select(exists(
            canary_subscriptions::table.find((subscriber.as_uuid(), canary_id.as_uuid())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(diesel_error("check subscription"))
    }

    async fn list_subscribers(
        &self,
        canary_id: &CanaryId,
    ) -> Result<Vec<UserId>, SubscriptionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let ids: Vec<Uuid> = canary_subscriptions::table
            .filter(canary_subscriptions::canary_id.eq(canary_id.as_uuid()))
            .order(canary_subscriptions::created_at.asc())
            .select(canary_subscriptions::user_id)
            .load(&mut conn)
            .await
            .map_err(diesel_error("list subscribers"))?;
        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}
