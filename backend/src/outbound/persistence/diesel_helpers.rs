//! Shared helpers for the Diesel study group adapter.
//!
//! - Error mapping from pool and Diesel errors to repository errors
//! - Casting between database `i32` columns and domain `u32` values

use tracing::debug;

use crate::domain::ports::StudyGroupRepositoryError;

use super::pool::PoolError;

/// Map pool errors to repository connection errors.
pub fn map_pool_error(error: PoolError) -> StudyGroupRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            StudyGroupRepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors.
pub fn map_diesel_error(error: diesel::result::Error) -> StudyGroupRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StudyGroupRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => {
            StudyGroupRepositoryError::query("database query error")
        }
        DieselError::DatabaseError(kind, _) => match kind {
            DatabaseErrorKind::UniqueViolation => {
                StudyGroupRepositoryError::query("study group already exists")
            }
            DatabaseErrorKind::ClosedConnection => {
                StudyGroupRepositoryError::connection("database connection error")
            }
            _ => StudyGroupRepositoryError::query("database error"),
        },
        _ => StudyGroupRepositoryError::query("database error"),
    }
}

/// Cast a database revision or capacity (i32) to its domain value (u32).
///
/// Negative values are refused by table constraints; one read back anyway is
/// reported as a corrupt row.
pub fn cast_from_db(value: i32, column: &str) -> Result<u32, StudyGroupRepositoryError> {
    u32::try_from(value).map_err(|_| {
        StudyGroupRepositoryError::query(format!("stored {column} {value} is negative"))
    })
}

/// Cast a domain revision or capacity (u32) to its database value (i32).
///
/// Values past `i32::MAX` are refused rather than wrapped into negatives.
pub fn cast_for_db(value: u32, column: &str) -> Result<i32, StudyGroupRepositoryError> {
    i32::try_from(value).map_err(|_| {
        StudyGroupRepositoryError::query(format!("{column} {value} does not fit its column"))
    })
}
