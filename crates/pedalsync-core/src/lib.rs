//! Live cycling session engine.
//!
//! This crate turns the raw, resettable counters of an indoor bike sensor
//! into a live session record, and periodically pushes that record's
//! progress to a persistence backend.
//!
//! # Features
//!
//! - **Session aggregation**: distance, cycles and calories that never go
//!   backwards, with hardware counter resets detected and handled
//! - **Calorie estimate**: MET-based, counted only while the wheel turns
//! - **Periodic sync**: a cancellable timer tied to the session's lifetime
//! - **Session controller**: one task serializing readings, ticks and
//!   commands, driven through a cloneable handle
//! - **Events**: broadcast of every lifecycle change
//! - **Test doubles**: scripted mock transport and in-memory store
//! - **REST backend** (feature `remote`): JSON-over-HTTP store
//!
//! # Architecture
//!
//! ```text
//! SensorTransport ─▶ ReadingStream ─▶ SessionController ─▶ SessionStore
//!                                      (SessionAggregator,    ▲
//!                                       SyncTimer) ───────────┘ SyncEmitter
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pedalsync_core::{
//!     MemoryStore, MockTransport, SensorTransport, SessionConfig, SessionController,
//! };
//! use pedalsync_types::SessionReading;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> pedalsync_core::Result<()> {
//! let transport = MockTransport::builder()
//!     .readings(
//!         Duration::from_millis(20),
//!         (1..=3).map(|i| SessionReading::new(20.0, i as f64 * 0.01, i * 3)),
//!     )
//!     .hold_open(true)
//!     .build();
//! transport.connect().await?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let handle = SessionController::spawn(
//!     SessionConfig::default(),
//!     transport.subscribe().await?,
//!     store.clone(),
//!     store.clone(),
//! )?;
//!
//! handle.start_session("rider", None).await?;
//! tokio::time::sleep(Duration::from_millis(200)).await;
//! let record = handle.stop_session().await?.unwrap();
//! assert_eq!(record.cycles, 9);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod calories;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod memory;
pub mod mock;
#[cfg(feature = "remote")]
pub mod remote;
pub mod streaming;
pub mod sync;
pub mod traits;
pub mod window;

pub use aggregator::{ActiveSessionTotals, SessionAggregator, UpdateOutcome};
pub use calories::{CYCLING_MET, CalorieModel};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use controller::{SessionController, SessionHandle};
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, ResetCause, SessionEvent};
pub use history::{completed_sessions, ride_summary};
pub use memory::MemoryStore;
pub use mock::{MockTransport, MockTransportBuilder, ScriptedReading};
#[cfg(feature = "remote")]
pub use remote::RestSessionStore;
pub use streaming::ReadingStream;
pub use sync::{SyncEmitter, SyncTimer};
pub use traits::{ProfileSource, SensorTransport, SessionStore};
pub use window::SpeedWindow;

// Re-export from pedalsync-types
pub use pedalsync_types::{
    NewSession, ReadingError, RideSummary, SessionId, SessionReading, SessionRecord,
    SessionSnapshot,
};
