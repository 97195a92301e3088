//! Trait abstractions for the session engine's collaborators.
//!
//! The engine consumes three capabilities it does not implement itself:
//!
//! - [`SensorTransport`]: connection lifecycle and a reading subscription.
//!   Scanning, pairing and protocol decoding live behind it.
//! - [`SessionStore`]: create/update/finalize/list of session records on the
//!   persistence backend.
//! - [`ProfileSource`]: the rider's stored body weight.
//!
//! [`MockTransport`](crate::MockTransport) and
//! [`MemoryStore`](crate::MemoryStore) implement these for tests.

use async_trait::async_trait;

use pedalsync_types::{NewSession, SessionRecord, SessionSnapshot};

use crate::error::Result;
use crate::streaming::ReadingStream;

/// A source of live sensor readings.
///
/// # Example
///
/// ```ignore
/// use pedalsync_core::{SensorTransport, Result};
/// use futures::StreamExt;
///
/// async fn first_reading<T: SensorTransport>(transport: &T) -> Result<()> {
///     transport.connect().await?;
///     let mut stream = transport.subscribe().await?;
///     if let Some(reading) = stream.next().await {
///         println!("{} km/h", reading.speed);
///     }
///     transport.disconnect().await
/// }
/// ```
#[async_trait]
pub trait SensorTransport: Send + Sync {
    /// Connect to the sensor. Connecting twice is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Disconnect from the sensor. Open subscriptions end.
    async fn disconnect(&self) -> Result<()>;

    /// Check if the transport is connected.
    async fn is_connected(&self) -> bool;

    /// Human-readable sensor name.
    fn name(&self) -> &str;

    /// Subscribe to readings. Requires a connection.
    async fn subscribe(&self) -> Result<ReadingStream>;
}

/// Persistence backend for session records.
///
/// Implementations must ignore `update_session` for records that were
/// already finalized, because periodic pushes run concurrently with the
/// final hand-off.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the record for a session that just started.
    async fn create_session(&self, session: &NewSession) -> Result<()>;

    /// Push partial progress of an active session.
    async fn update_session(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Store the final record of a stopped session.
    async fn finalize_session(&self, record: &SessionRecord) -> Result<()>;

    /// List a user's finalized sessions, newest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>>;
}

/// Read access to rider profiles.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// The rider's stored body weight, if any.
    async fn user_weight_kg(&self, user_id: &str) -> Result<Option<f64>>;
}
