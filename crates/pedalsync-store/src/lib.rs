//! Local persistence for cycling sessions.
//!
//! This crate provides SQLite-based storage for session records and rider
//! profiles, so finished rides survive restarts and the session engine has
//! a weight to start from.
//!
//! # Features
//!
//! - Create, update and finalize session records
//! - Updates to a finalized session are ignored
//! - Query by user, time range and distance, with pagination
//! - Per-rider body weight
//! - CSV export
//!
//! # Example
//!
//! ```no_run
//! use pedalsync_store::{SessionQuery, Store};
//!
//! let store = Store::open_default()?;
//!
//! let query = SessionQuery::new()
//!     .user("rider")
//!     .with_distance()
//!     .limit(10);
//! for session in store.query_sessions(&query)? {
//!     println!("{} {:.2} km", session.session_id, session.distance);
//! }
//! # Ok::<(), pedalsync_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{StoredProfile, StoredSession};
pub use queries::SessionQuery;
pub use store::{Store, UpdateResult};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/pedalsync/data.db`
/// - macOS: `~/Library/Application Support/pedalsync/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\pedalsync\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pedalsync")
        .join("data.db")
}
