//! PostgreSQL-backed `WarrantRepository`.
//!
//! Every transition is a conditional `UPDATE`. Publishing runs in one
//! transaction that locks the canary row before any warrant row, the same
//! order a canary delete takes through its cascade, so concurrent publishes
//! and deletes on the same canary apply one after the other and the partial unique index on
//! `active` never sees two active rows. Drafts issued at or before the
//! retention cutoff are filtered out of every query that takes `now`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Jsonb, Timestamptz, Uuid as SqlUuid};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{WarrantRepository, WarrantRepositoryError};
use crate::domain::{CanaryId, Document, UserId, Warrant, WarrantId, WarrantStatement, draft_cutoff};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{RowDecodeError, WarrantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{canaries, canary_warrants};

/// Diesel-backed warrant store.
#[derive(Clone)]
pub struct DieselWarrantRepository {
    pool: DbPool,
}

impl DieselWarrantRepository {
    /// Create a repository over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const APPEND_DOCUMENT_SQL: &str = r"
UPDATE canary_warrants
SET documents = documents || jsonb_build_array($1::jsonb)
WHERE id = $2
  AND user_id = $3
  AND published = FALSE
  AND issued > $4
  AND jsonb_array_length(documents) < $5
";

fn pool_error(error: PoolError) -> WarrantRepositoryError {
    map_pool_error(error, WarrantRepositoryError::connection)
}

fn diesel_error(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> WarrantRepositoryError {
    move |error| {
        map_diesel_error(
            error,
            operation,
            WarrantRepositoryError::query,
            WarrantRepositoryError::connection,
        )
    }
}

fn decode_error(error: RowDecodeError) -> WarrantRepositoryError {
    WarrantRepositoryError::query(error.to_string())
}

fn decode_rows(rows: Vec<WarrantRow>) -> Result<Vec<Warrant>, WarrantRepositoryError> {
    rows.into_iter()
        .map(|row| Warrant::try_from(row).map_err(decode_error))
        .collect()
}

#[async_trait]
impl WarrantRepository for DieselWarrantRepository {
    async fn insert(&self, warrant: &Warrant) -> Result<(), WarrantRepositoryError> {
        let row = WarrantRow::try_from(warrant).map_err(decode_error)?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(canary_warrants::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(diesel_error("insert warrant"))?;
        Ok(())
    }

    async fn find_open_draft(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = canary_warrants::table
            .filter(canary_warrants::id.eq(warrant_id.as_uuid()))
            .filter(canary_warrants::user_id.eq(owner.as_uuid()))
            .filter(canary_warrants::published.eq(false))
            .filter(canary_warrants::issued.gt(draft_cutoff(now)))
            .select(WarrantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find draft"))?;
        row.map(Warrant::try_from).transpose().map_err(decode_error)
    }

    async fn append_document(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        document: &Document,
        max_documents: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, WarrantRepositoryError> {
        let encoded = serde_json::to_value(document)
            .map_err(|err| WarrantRepositoryError::query(format!("encode document: {err}")))?;
        let max = i64::try_from(max_documents).unwrap_or(i64::MAX);
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let updated = sql_query(APPEND_DOCUMENT_SQL)
            .bind::<Jsonb, _>(&encoded)
            .bind::<SqlUuid, _>(warrant_id.as_uuid())
            .bind::<SqlUuid, _>(owner.as_uuid())
            .bind::<Timestamptz, _>(draft_cutoff(now))
            .bind::<BigInt, _>(max)
            .execute(&mut conn)
            .await
            .map_err(diesel_error("append document"))?;
        Ok(updated == 1)
    }

    async fn publish(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        statement: &WarrantStatement,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        let id = *warrant_id.as_uuid();
        let owner = *owner.as_uuid();
        let cutoff = draft_cutoff(now);
        let concern = statement.concern.as_str();
        let text = statement.statement.as_str();
        let signature = statement.signature.as_str();
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = conn
            .transaction(|conn| {
                async move {
                    // Same lock order as canary deletion: canary row first,
                    // warrant rows second.
                    let canary_id: Option<uuid::Uuid> = canary_warrants::table
                        .filter(canary_warrants::id.eq(id))
                        .select(canary_warrants::canary_id)
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(canary_id) = canary_id else {
                        return Ok(None);
                    };
                    let locked: Option<uuid::Uuid> = canaries::table
                        .find(canary_id)
                        .select(canaries::id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Ok(None);
                    }

                    let eligible: Option<uuid::Uuid> = canary_warrants::table
                        .filter(canary_warrants::id.eq(id))
                        .filter(canary_warrants::canary_id.eq(canary_id))
                        .filter(canary_warrants::user_id.eq(owner))
                        .filter(canary_warrants::published.eq(false))
                        .filter(canary_warrants::issued.gt(cutoff))
                        .select(canary_warrants::id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    if eligible.is_none() {
                        return Ok(None);
                    }

                    // Siblings first: the partial unique index allows one
                    // active row per canary at any instant.
                    diesel::update(
                        canary_warrants::table
                            .filter(canary_warrants::canary_id.eq(canary_id))
                            .filter(canary_warrants::id.ne(id))
                            .filter(canary_warrants::active.eq(true)),
                    )
                    .set(canary_warrants::active.eq(false))
                    .execute(conn)
                    .await?;

                    diesel::update(
                        canary_warrants::table
                            .find(id)
                            .filter(canary_warrants::published.eq(false)),
                    )
                    .set((
                        canary_warrants::published.eq(true),
                        canary_warrants::active.eq(true),
                        canary_warrants::concern.eq(Some(concern)),
                        canary_warrants::statement.eq(Some(text)),
                        canary_warrants::signature.eq(Some(signature)),
                    ))
                    .returning(WarrantRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error("publish warrant"))?;

        row.map(Warrant::try_from).transpose().map_err(decode_error)
    }

    async fn find_published(
        &self,
        canary_id: &CanaryId,
        page: u32,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = canary_warrants::table
            .filter(canary_warrants::canary_id.eq(canary_id.as_uuid()))
            .filter(canary_warrants::published.eq(true))
            .order((canary_warrants::issued.desc(), canary_warrants::id.desc()))
            .offset(i64::from(page))
            .select(WarrantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error("find published warrant"))?;
        row.map(Warrant::try_from).transpose().map_err(decode_error)
    }

    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Warrant>, WarrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = canary_warrants::table
            .filter(canary_warrants::active.eq(true))
            .filter(canary_warrants::overdue_notified.eq(false))
            .filter(canary_warrants::next_canary.lt(now))
            .order(canary_warrants::next_canary.asc())
            .select(WarrantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error("list overdue warrants"))?;
        decode_rows(rows)
    }

    async fn mark_overdue_notified(
        &self,
        warrant_id: &WarrantId,
    ) -> Result<bool, WarrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let updated = diesel::update(
            canary_warrants::table
                .find(warrant_id.as_uuid())
                .filter(canary_warrants::active.eq(true))
                .filter(canary_warrants::overdue_notified.eq(false)),
        )
        .set(canary_warrants::overdue_notified.eq(true))
        .execute(&mut conn)
        .await
        .map_err(diesel_error("claim overdue alert"))?;
        Ok(updated == 1)
    }

    async fn purge_expired_drafts(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, WarrantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed = diesel::delete(
            canary_warrants::table
                .filter(canary_warrants::published.eq(false))
                .filter(canary_warrants::issued.le(draft_cutoff(now))),
        )
        .execute(&mut conn)
        .await
        .map_err(diesel_error("purge expired drafts"))?;
        Ok(u64::try_from(removed).unwrap_or(0))
    }
}
