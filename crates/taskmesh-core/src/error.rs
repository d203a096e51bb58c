//! Core error types for taskmesh-core.
//!
//! This module defines the error hierarchy using thiserror. Logical
//! "no result" cases (recurrence exhausted, nothing movable, empty day)
//! are plain `Option`/empty-`Vec` returns and never appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for taskmesh-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record-store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Record-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Task is not a recurring parent
    #[error("Task '{0}' has no recurrence rule")]
    NotRecurring(String),

    /// Unknown snapshot id
    #[error("Unknown snapshot: {0}")]
    UnknownSnapshot(String),

    /// Snapshot owned by a different user
    #[error("Snapshot {id} does not belong to user {user_id}")]
    SnapshotUserMismatch { id: String, user_id: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
