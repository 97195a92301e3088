//! In-memory persistence backend.
//!
//! [`MemoryStore`] implements both [`SessionStore`] and [`ProfileSource`]
//! without any I/O. It backs unit tests and demos, and supports failure
//! injection so callers can exercise the "sync failed, keep riding" path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use pedalsync_types::{NewSession, SessionId, SessionRecord, SessionSnapshot};

use crate::error::{Error, Result};
use crate::traits::{ProfileSource, SessionStore};

#[derive(Debug, Clone)]
struct MemorySession {
    created: NewSession,
    last_snapshot: Option<SessionSnapshot>,
    record: Option<SessionRecord>,
}

/// A session store that lives in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, MemorySession>>,
    weights: RwLock<HashMap<String, f64>>,
    fail_writes: AtomicBool,
    fail_profiles: AtomicBool,
    update_count: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rider's weight.
    pub async fn set_weight(&self, user_id: &str, weight_kg: f64) {
        self.weights
            .write()
            .await
            .insert(user_id.to_string(), weight_kg);
    }

    /// Make every write (create, update, finalize) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Make profile lookups fail.
    pub fn set_fail_profiles(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::Relaxed);
    }

    /// Number of accepted `update_session` calls.
    pub fn update_count(&self) -> u32 {
        self.update_count.load(Ordering::Relaxed)
    }

    /// Whether a record was created for this session.
    pub async fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    /// The creation payload of a session.
    pub async fn created(&self, session_id: SessionId) -> Option<NewSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|s| s.created.clone())
    }

    /// The last snapshot accepted for a session.
    pub async fn last_snapshot(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .and_then(|s| s.last_snapshot.clone())
    }

    /// The final record of a session, once finalized.
    pub async fn record(&self, session_id: SessionId) -> Option<SessionRecord> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .and_then(|s| s.record.clone())
    }

    fn check_writable(&self, operation: &'static str) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::store(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &NewSession) -> Result<()> {
        self.check_writable("create_session")?;
        self.sessions
            .write()
            .await
            .entry(session.session_id)
            .or_insert_with(|| MemorySession {
                created: session.clone(),
                last_snapshot: None,
                record: None,
            });
        Ok(())
    }

    async fn update_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.check_writable("update_session")?;
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&snapshot.session_id)
            .ok_or(Error::SessionNotFound(snapshot.session_id))?;
        if session.record.is_none() {
            session.last_snapshot = Some(snapshot.clone());
            self.update_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn finalize_session(&self, record: &SessionRecord) -> Result<()> {
        self.check_writable("finalize_session")?;
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(record.session_id)
            .or_insert_with(|| MemorySession {
                created: NewSession {
                    session_id: record.session_id,
                    user_id: record.user_id.clone(),
                    started_at: record.started_at,
                    user_weight_kg: record.user_weight_kg,
                },
                last_snapshot: None,
                record: None,
            });
        session.record = Some(record.clone());
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let sessions = self.sessions.read().await;
        let mut records: Vec<SessionRecord> = sessions
            .values()
            .filter_map(|s| s.record.as_ref())
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

#[async_trait]
impl ProfileSource for MemoryStore {
    async fn user_weight_kg(&self, user_id: &str) -> Result<Option<f64>> {
        if self.fail_profiles.load(Ordering::Relaxed) {
            return Err(Error::store("user_weight_kg", "injected failure"));
        }
        Ok(self.weights.read().await.get(user_id).copied())
    }
}
