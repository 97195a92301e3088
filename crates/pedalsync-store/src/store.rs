//! Main store implementation.

use std::io::Write;
use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info};

use pedalsync_types::{NewSession, SessionId, SessionRecord, SessionSnapshot};

use crate::error::{Error, Result};
use crate::models::{SessionCsvRow, StoredProfile, StoredSession};
use crate::queries::SessionQuery;
use crate::schema;

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, started_at, ended_at, weight_kg, \
     duration_secs, distance, cycles, calories, avg_speed, max_speed, finalized, updated_at";

/// What an `update_session` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Progress columns were overwritten.
    Applied,
    /// The session is already finalized; nothing changed.
    AlreadyFinalized,
}

/// SQLite-based store for sessions and profiles.
pub struct Store {
    conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Session operations
impl Store {
    /// Insert the row for a session that just started.
    ///
    /// Creating the same session twice keeps the first row.
    pub fn create_session(&self, session: &NewSession) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sessions (id, user_id, started_at, weight_kg, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                session.session_id.to_string(),
                session.user_id,
                session.started_at.unix_timestamp(),
                session.user_weight_kg,
                now,
            ],
        )?;
        debug!(
            "create_session {} ({} row inserted)",
            session.session_id, inserted
        );
        Ok(())
    }

    /// Overwrite the progress of an active session.
    ///
    /// Finalized sessions are left untouched.
    pub fn update_session(&self, snapshot: &SessionSnapshot) -> Result<UpdateResult> {
        let id = snapshot.session_id.to_string();
        let changed = self.conn.execute(
            "UPDATE sessions SET
                duration_secs = ?2,
                distance = ?3,
                cycles = ?4,
                calories = ?5,
                avg_speed = ?6,
                max_speed = ?7,
                updated_at = ?8
             WHERE id = ?1 AND finalized = 0",
            rusqlite::params![
                id,
                snapshot.duration_secs as i64,
                snapshot.distance,
                snapshot.cycles as i64,
                snapshot.calories,
                snapshot.avg_speed,
                snapshot.max_speed,
                snapshot.taken_at.unix_timestamp(),
            ],
        )?;

        if changed > 0 {
            return Ok(UpdateResult::Applied);
        }

        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sessions WHERE id = ?",
            [&id],
            |row| row.get(0),
        )?;
        if exists {
            debug!("Ignoring update for finalized session {}", id);
            Ok(UpdateResult::AlreadyFinalized)
        } else {
            Err(Error::SessionNotFound(snapshot.session_id))
        }
    }

    /// Write the final record of a session, creating the row if needed.
    pub fn finalize_session(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, started_at, ended_at, weight_kg, duration_secs,
                distance, cycles, calories, avg_speed, max_speed, finalized, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?4)
             ON CONFLICT(id) DO UPDATE SET
                started_at = ?3,
                ended_at = ?4,
                weight_kg = ?5,
                duration_secs = ?6,
                distance = ?7,
                cycles = ?8,
                calories = ?9,
                avg_speed = ?10,
                max_speed = ?11,
                finalized = 1,
                updated_at = ?4",
            rusqlite::params![
                record.session_id.to_string(),
                record.user_id,
                record.started_at.unix_timestamp(),
                record.ended_at.unix_timestamp(),
                record.user_weight_kg,
                record.duration_secs as i64,
                record.distance,
                record.cycles as i64,
                record.calories,
                record.avg_speed,
                record.max_speed,
            ],
        )?;
        info!(
            "Stored session {} ({:.3} km, {} kcal)",
            record.session_id, record.distance, record.calories
        );
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, session_id: SessionId) -> Result<Option<StoredSession>> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS);
        let session = self
            .conn
            .query_row(&sql, [session_id.to_string()], row_to_session)
            .optional()?;
        Ok(session)
    }

    /// Query sessions with filters.
    pub fn query_sessions(&self, query: &SessionQuery) -> Result<Vec<StoredSession>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params_ref.as_slice(), row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Finished records of a user, newest first.
    pub fn list_records(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let sessions = self.query_sessions(&SessionQuery::new().user(user_id))?;
        Ok(sessions.iter().filter_map(StoredSession::to_record).collect())
    }

    /// Count sessions, optionally for one user.
    pub fn count_sessions(&self, user_id: Option<&str>) -> Result<u64> {
        let count: i64 = match user_id {
            Some(user) => self.conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
                [user],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Delete a session. Returns whether a row was removed.
    pub fn delete_session(&self, session_id: SessionId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?", [session_id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Write the sessions matching `query` as CSV. Returns the row count.
    pub fn export_csv<W: Write>(&self, query: &SessionQuery, writer: W) -> Result<usize> {
        let sessions = self.query_sessions(query)?;
        let mut csv = csv::Writer::from_writer(writer);
        for session in &sessions {
            csv.serialize(SessionCsvRow::new(session))?;
        }
        csv.flush()?;
        Ok(sessions.len())
    }
}

// Profile operations
impl Store {
    /// Set a rider's body weight.
    pub fn set_user_weight(&self, user_id: &str, weight_kg: f64) -> Result<()> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(Error::InvalidWeight(weight_kg));
        }
        self.conn.execute(
            "INSERT INTO profiles (user_id, weight_kg, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET weight_kg = ?2, updated_at = ?3",
            rusqlite::params![
                user_id,
                weight_kg,
                OffsetDateTime::now_utc().unix_timestamp()
            ],
        )?;
        Ok(())
    }

    /// A rider's stored body weight.
    pub fn user_weight(&self, user_id: &str) -> Result<Option<f64>> {
        Ok(self.get_profile(user_id)?.map(|p| p.weight_kg))
    }

    /// A rider's profile.
    pub fn get_profile(&self, user_id: &str) -> Result<Option<StoredProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT user_id, weight_kg, updated_at FROM profiles WHERE user_id = ?",
                [user_id],
                |row| {
                    Ok(StoredProfile {
                        user_id: row.get(0)?,
                        weight_kg: row.get(1)?,
                        updated_at: timestamp(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    let id: String = row.get(0)?;
    let session_id = id
        .parse::<SessionId>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let ended_at = match row.get::<_, Option<i64>>(3)? {
        Some(_) => Some(timestamp(row, 3)?),
        None => None,
    };

    Ok(StoredSession {
        session_id,
        user_id: row.get(1)?,
        started_at: timestamp(row, 2)?,
        ended_at,
        weight_kg: row.get(4)?,
        duration_secs: row.get::<_, i64>(5)? as u64,
        distance: row.get(6)?,
        cycles: row.get::<_, i64>(7)? as u64,
        calories: row.get(8)?,
        avg_speed: row.get(9)?,
        max_speed: row.get(10)?,
        finalized: row.get(11)?,
        updated_at: timestamp(row, 12)?,
    })
}
