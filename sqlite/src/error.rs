//! Error types for SQLite record store operations.
//!
//! Provides a unified error type covering database access, conversion,
//! migration, and record validation failures.

use phylofeat_core::ValidationError;
use thiserror::Error;

/// Errors that can occur during SQLite record store operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Record-to-row or row-to-record conversion failure.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// Requested dataset was not found.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// A dataset with the same name is already stored.
    #[error("dataset already stored: {0}")]
    DatasetExists(String),

    /// Records failed validation and were not written.
    #[error("refusing to store inconsistent records: {0:?}")]
    InvalidRecords(Vec<ValidationError>),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
