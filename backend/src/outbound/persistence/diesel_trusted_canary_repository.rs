//! PostgreSQL-backed `TrustedCanaryRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TrustedCanaryRepository, TrustedCanaryRepositoryError};
use crate::domain::{CanaryDomain, TrustedCanary, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewTrustedCanaryRow, RowDecodeError, TrustedCanaryRow};
use super::pool::{DbPool, PoolError};
use super::schema::trusted_canaries;

/// Diesel-backed trust anchor store.
#[derive(Clone)]
pub struct DieselTrustedCanaryRepository {
    pool: DbPool,
}

impl DieselTrustedCanaryRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> TrustedCanaryRepositoryError {
    map_pool_error(error, TrustedCanaryRepositoryError::connection)
}

fn diesel_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> TrustedCanaryRepositoryError {
    move |error| {
        map_diesel_error(
            error,
            operation,
            TrustedCanaryRepositoryError::query,
            TrustedCanaryRepositoryError::connection,
        )
    }
}

fn decode_error(error: RowDecodeError) -> TrustedCanaryRepositoryError {
    TrustedCanaryRepositoryError::query(error.to_string())
}

#[async_trait]
impl TrustedCanaryRepository for DieselTrustedCanaryRepository {
    async fn insert(&self, trusted: &TrustedCanary) -> Result<bool, TrustedCanaryRepositoryError> {
        let row = NewTrustedCanaryRow {
            user_id: *trusted.user.as_uuid(),
            domain: trusted.domain.as_str(),
            public_key_hash: &trusted.public_key_hash,
        };
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let inserted = diesel::insert_into(trusted_canaries::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(diesel_error("pin trust anchor"))?;
        Ok(inserted == 1)
    }

    async fn find(
        &self,
        user: &UserId,
        domain: &CanaryDomain,
    ) -> Result<Option<TrustedCanary>, TrustedCanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = trusted_canaries::table
            .find((user.as_uuid(), domain.as_str()))
            .select(TrustedCanaryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find trust anchor"))?;
        row.map(TrustedCanary::try_from)
            .transpose()
            .map_err(decode_error)
    }

    async fn list(&self, user: &UserId) -> Result<Vec<TrustedCanary>, TrustedCanaryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = trusted_canaries::table
            .filter(trusted_canaries::user_id.eq(user.as_uuid()))
            .order(trusted_canaries::created_at.asc())
            .select(TrustedCanaryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error("list trust anchors"))?;
        rows.into_iter()
            .map(|row| TrustedCanary::try_from(row).map_err(decode_error))
            .collect()
    }
}
