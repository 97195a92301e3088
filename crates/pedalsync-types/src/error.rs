//! Error types for reading validation in pedalsync-types.

use thiserror::Error;

/// Reasons a sensor reading is rejected before it reaches a session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ReadingError {
    /// A numeric field is NaN or infinite.
    #[error("{field} is not a finite number ({value})")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A numeric field is below zero.
    #[error("{field} must not be negative (got {value})")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Result type alias using pedalsync-types' ReadingError type.
pub type ReadingResult<T> = std::result::Result<T, ReadingError>;
