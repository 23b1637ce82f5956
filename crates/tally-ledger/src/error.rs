//! # Ledger Errors
//!
//! The error type returned by every engine operation.
//!
//! ```text
//! CoreError ──────────────┐
//! ValidationError ────────┼──► LedgerError::Core
//! DbError::NotFound ──────┘
//! DbError::Busy ──────────────► LedgerError::ConcurrencyConflict  (retryable)
//! DbError (anything else) ────► LedgerError::Db
//! ```

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    // =========================================================================
    // Business Errors
    // =========================================================================
    /// A business rule rejected the operation. Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Db(DbError),

    /// Lost a write race after every retry.
    #[error("Concurrent update conflict during {operation}, please retry")]
    ConcurrencyConflict { operation: String },
}

impl LedgerError {
    pub fn conflict(operation: impl Into<String>) -> Self {
        LedgerError::ConcurrencyConflict {
            operation: operation.into(),
        }
    }

    /// True when running the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }

    /// The business error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Core(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::Core(CoreError::NotFound { entity, id }),
            err if err.is_contention() => LedgerError::conflict("storage"),
            err => LedgerError::Db(err),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
