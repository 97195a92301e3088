//! Platform-agnostic types for live cycling session tracking.
//!
//! This crate provides the data types shared by the session engine
//! (pedalsync-core), the local store (pedalsync-store) and the CLI.
//!
//! # Features
//!
//! - Sensor readings as delivered by the transport, with validation
//! - Session identifiers
//! - Creation, snapshot and final-record payloads for the backend
//! - Dashboard summaries over finished sessions
//!
//! # Example
//!
//! ```
//! use pedalsync_types::{SessionId, SessionReading};
//!
//! let reading = SessionReading::new(21.4, 3.2, 812).with_rpm(78.0);
//! assert!(reading.validate().is_ok());
//!
//! let id = SessionId::new();
//! println!("session {id}");
//! ```

pub mod error;
pub mod session;
pub mod types;

pub use error::{ReadingError, ReadingResult};
pub use session::{NewSession, RideSummary, SessionRecord, SessionSnapshot};
pub use types::{SessionId, SessionReading};
