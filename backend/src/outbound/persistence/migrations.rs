//! Embedded schema migrations applied at startup.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::pool::PoolError;

/// Migrations from the `backend/migrations` directory.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply every pending migration on a dedicated blocking connection.
///
/// # Errors
///
/// [`PoolError::Build`] when the database is unreachable or a migration
/// fails; the server must not start against a stale schema.
pub async fn run_migrations(database_url: &str) -> Result<(), PoolError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)
            .map_err(|err| PoolError::build(format!("connect for migrations: {err}")))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| PoolError::build(format!("migration: {err}")))
    })
    .await
    .map_err(|err| PoolError::build(format!("migration task: {err}")))??;
    info!(applied, "database migrations applied");
    Ok(())
}
