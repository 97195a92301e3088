//! Error types for pedalsync-core.
//!
//! Nothing in the live session path turns an anomaly into an error for the
//! rider. Hardware counter resets are an expected input, missing profile data
//! falls back to a default weight, and failed backend pushes are logged and
//! retried implicitly on the next sync tick. The variants below surface at
//! the edges instead: transport lifecycle calls, collaborator
//! implementations, configuration validation and a closed controller.
//!
//! ## Where each error comes from
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | [`Error::NotConnected`] | `SensorTransport::subscribe` | Connect first |
//! | [`Error::ConnectionFailed`] | `SensorTransport::connect` | Retry, or pick another sensor |
//! | [`Error::Store`] | `SessionStore` / `ProfileSource` impls | Logged by the controller, next tick retries |
//! | [`Error::SessionNotFound`] | `SessionStore::update_session` | Controller re-creates the record |
//! | [`Error::InvalidReading`] | Reading validation | Reading is dropped |
//! | [`Error::InvalidConfig`] | `SessionConfig::validate` | Fix configuration |
//! | [`Error::ControllerClosed`] | `SessionHandle` methods | Spawn a new controller |

use thiserror::Error;

use pedalsync_types::{ReadingError, SessionId};

/// Errors produced by the session engine and its collaborators.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation attempted while the sensor transport is not connected.
    #[error("Sensor transport is not connected")]
    NotConnected,

    /// Connecting to the sensor failed.
    #[error("Connection to '{transport}' failed: {reason}")]
    ConnectionFailed {
        /// Name of the transport or sensor.
        transport: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A persistence or profile backend call failed.
    #[error("Store operation '{operation}' failed: {message}")]
    Store {
        /// The collaborator operation that failed.
        operation: &'static str,
        /// Backend-specific description.
        message: String,
    },

    /// The backend has no record for this session.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// A sensor reading failed validation.
    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ReadingError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session controller task has exited.
    #[error("Session controller is no longer running")]
    ControllerClosed,

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a store error for a named collaborator operation.
    pub fn store(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Store {
            operation,
            message: err.to_string(),
        }
    }

    /// Create a connection failure.
    pub fn connection_failed(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using pedalsync-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Sensor transport is not connected");

        let err = Error::connection_failed("Trainer 01", "out of range");
        assert!(err.to_string().contains("Trainer 01"));
        assert!(err.to_string().contains("out of range"));

        let err = Error::store("update_session", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "Store operation 'update_session' failed: HTTP 503"
        );

        let err = Error::invalid_config("sync_interval must be > 0");
        assert!(err.to_string().contains("sync_interval"));
    }

    #[test]
    fn test_reading_error_conversion() {
        let reading_err = ReadingError::Negative {
            field: "speed",
            value: -2.0,
        };
        let err: Error = reading_err.into();
        assert!(matches!(err, Error::InvalidReading(_)));
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn test_session_not_found_mentions_id() {
        let id = SessionId::new();
        let err = Error::SessionNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
