//! Store error handling
//!
//! Typed errors for query and mutation operations. Validation and
//! uniqueness failures carry a human-readable reason; storage failures
//! wrap the underlying SQLite or pool error. The transaction that hit a
//! storage failure is rolled back before the error reaches the caller.

use rusqlite::ffi;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Required input missing or malformed
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A uniqueness rule would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Acting user does not own the record, or is anonymous
    #[error("Operation not permitted for this user")]
    Forbidden,

    /// SQLite error (the active transaction was rolled back)
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Could not obtain a session from the connection pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        StoreError::Validation(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        StoreError::Conflict(reason.into())
    }

    /// Check if the caller can fix the request and try again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::Conflict(_))
    }

    /// Check if this is a "cannot proceed" error
    ///
    /// Covers both missing and foreign records. Callers facing
    /// unauthenticated users should report these identically.
    pub fn is_denied(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::Forbidden)
    }

    /// Map a SQLite UNIQUE/PRIMARY KEY violation to `Conflict`
    ///
    /// Other errors pass through unchanged.
    pub fn or_conflict(self, reason: impl Into<String>) -> Self {
        if self.is_unique_violation() {
            StoreError::Conflict(reason.into())
        } else {
            self
        }
    }

    /// Check if the error came from a UNIQUE or PRIMARY KEY constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Storage(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
                    && (err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            }
            _ => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
