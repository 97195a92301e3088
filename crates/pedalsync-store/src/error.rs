//! Error types for pedalsync-store.

use std::path::PathBuf;

use pedalsync_types::SessionId;

/// Result type for pedalsync-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pedalsync-store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No record exists for this session.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Body weight must be a positive number.
    #[error("Invalid weight: {0} kg")]
    InvalidWeight(f64),

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
