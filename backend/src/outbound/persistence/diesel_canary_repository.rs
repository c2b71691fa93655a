//! PostgreSQL-backed `CanaryRepository`.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{CanaryRepository, CanaryRepositoryError, LogoUpdate};
use crate::domain::{Canary, CanaryDomain, CanaryId, UserId};

use super::diesel_error_mapping::{
    DieselFailure, classify_diesel_error, map_diesel_error, map_pool_error,
};
use super::models::{CanaryRow, RowDecodeError};
use super::pool::{DbPool, PoolError};
use super::schema::{canaries, deleted_canaries};

/// Diesel-backed canary store.
#[derive(Clone)]
pub struct DieselCanaryRepository {
    pool: DbPool,
}

impl DieselCanaryRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> CanaryRepositoryError {
    map_pool_error(error, CanaryRepositoryError::connection)
}

fn diesel_error(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> CanaryRepositoryError {
    move |error| {
        map_diesel_error(
            error,
            operation,
            CanaryRepositoryError::query,
            CanaryRepositoryError::connection,
        )
    }
}

fn decode_error(error: RowDecodeError) -> CanaryRepositoryError {
    CanaryRepositoryError::query(error.to_string())
}

fn decode(row: Option<CanaryRow>) -> Result<Option<Canary>, CanaryRepositoryError> {
    row.map(Canary::try_from).transpose().map_err(decode_error)
}

#[async_trait]
impl CanaryRepository for DieselCanaryRepository {
    async fn insert(&self, canary: &Canary) -> Result<(), CanaryRepositoryError> {
        let row = CanaryRow::from(canary);
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let result = diesel::insert_into(canaries::table)
            .values(&row)
            .execute(&mut conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(error) => Err(match classify_diesel_error(error, "insert canary") {
                DieselFailure::UniqueViolation(_) => CanaryRepositoryError::duplicate(),
                DieselFailure::Connection(message) => CanaryRepositoryError::connection(message),
                DieselFailure::Query(message) => CanaryRepositoryError::query(message),
            }),
        }
    }

    async fn is_domain_taken(
        &self,
        domain: &CanaryDomain,
        requester: &UserId,
    ) -> Result<bool, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let registered: bool = diesel::select(exists(
            canaries::table.filter(canaries::domain.eq(domain.as_str())).filter(
                canaries::verification_completed
                    .eq(true)
                    .or(canaries::user_id.eq(requester.as_uuid())),
            ),
        ))
        .get_result(&mut conn)
        .await
        .map_err(diesel_error("check domain registrations"))?;
        if registered {
            return Ok(true);
        }

        diesel::select(exists(deleted_canaries::table.find(domain.fingerprint())))
            .get_result(&mut conn)
            .await
            .map_err(diesel_error("check deleted domains"))
    }

    async fn find_by_domain(
        &self,
        domain: &CanaryDomain,
    ) -> Result<Option<Canary>, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = canaries::table
            .filter(canaries::domain.eq(domain.as_str()))
            .order((
                canaries::verification_completed.desc(),
                canaries::created.asc(),
            ))
            .select(CanaryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find canary by domain"))?;
        decode(row)
    }

    async fn find_owned(
        &self,
        domain: &CanaryDomain,
        owner: &UserId,
    ) -> Result<Option<Canary>, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = canaries::table
            .filter(canaries::domain.eq(domain.as_str()))
            .filter(canaries::user_id.eq(owner.as_uuid()))
            .select(CanaryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find owned canary"))?;
        decode(row)
    }

    async fn find_by_id(&self, id: &CanaryId) -> Result<Option<Canary>, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = canaries::table
            .find(id.as_uuid())
            .select(CanaryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find canary"))?;
        decode(row)
    }

    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Canary>, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = canaries::table
            .filter(canaries::user_id.eq(owner.as_uuid()))
            .order((canaries::created.asc(), canaries::id.asc()))
            .select(CanaryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error("list canaries"))?;
        rows.into_iter()
            .map(|row| Canary::try_from(row).map_err(decode_error))
            .collect()
    }

    async fn mark_verified(&self, id: &CanaryId) -> Result<bool, CanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let result = diesel::update(
            canaries::table
                .find(id.as_uuid())
                .filter(canaries::verification_completed.eq(false)),
        )
        .set(canaries::verification_completed.eq(true))
        .execute(&mut conn)
        .await;
        match result {
            Ok(updated) => Ok(updated == 1),
            Err(error) => match classify_diesel_error(error, "mark canary verified") {
                // Another registration for the domain verified first.
                DieselFailure::UniqueViolation(_) => Ok(false),
                DieselFailure::Connection(message) => {
                    Err(CanaryRepositoryError::connection(message))
                }
                DieselFailure::Query(message) => Err(CanaryRepositoryError::query(message)),
            },
        }
    }

    async fn set_logo(
        &self,
        id: &CanaryId,
        file_ref: &str,
    ) -> Result<LogoUpdate, CanaryRepositoryError> {
        let id = *id.as_uuid();
        let file_ref = file_ref.to_owned();
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| {
            async move {
                let previous: Option<Option<String>> = canaries::table
                    .find(id)
                    .select(canaries::logo)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let Some(previous) = previous else {
                    return Ok(LogoUpdate::Missing);
                };
                diesel::update(canaries::table.find(id))
                    .set(canaries::logo.eq(Some(file_ref)))
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(LogoUpdate::Replaced { previous })
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error("set canary logo"))
    }

    async fn delete(&self, canary: &Canary) -> Result<(), CanaryRepositoryError> {
        let id = *canary.id.as_uuid();
        let fingerprint = canary.domain.fingerprint();
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::delete(canaries::table.find(id)).execute(conn).await?;
                diesel::insert_into(deleted_canaries::table)
                    .values(deleted_canaries::domain_hash.eq(fingerprint))
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error("delete canary"))
    }
}
