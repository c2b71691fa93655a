//! Diesel and pool error projection shared by the canary repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a Diesel failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped mid-operation.
    Connection(String),
    /// A unique index rejected the write.
    UniqueViolation(String),
    /// Anything else.
    Query(String),
}

/// Classify a Diesel error, logging the driver detail at debug level.
pub(crate) fn classify_diesel_error(error: DieselError, operation: &str) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(error = %error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DieselFailure::Connection(format!("{operation}: database connection closed"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation(format!("{operation}: {}", info.message()))
        }
        DieselError::DatabaseError(_, info) => {
            DieselFailure::Query(format!("{operation}: {}", info.message()))
        }
        DieselError::NotFound => DieselFailure::Query(format!("{operation}: record not found")),
        other => DieselFailure::Query(format!("{operation}: {other}")),
    }
}

/// Map a pool error with a repository-specific connection constructor.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.into_message())
}

/// Map a Diesel error onto `query` and `connection` constructors, folding
/// unique violations into `query`.
pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    operation: &str,
    query: impl FnOnce(String) -> E,
    connection: impl FnOnce(String) -> E,
) -> E {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => connection(message),
        DieselFailure::UniqueViolation(message) | DieselFailure::Query(message) => query(message),
    }
}
