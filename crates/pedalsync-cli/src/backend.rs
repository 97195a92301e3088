//! Local SQLite backend for live sessions.

use std::sync::Arc;

use async_trait::async_trait;
use pedalsync_core::{ProfileSource, SessionStore};
use pedalsync_store::{Store, UpdateResult};
use pedalsync_types::{NewSession, SessionRecord, SessionSnapshot};
use tokio::sync::Mutex;

/// Adapts the synchronous [`Store`] to the controller's collaborator traits.
///
/// Queries are short single-row statements, so they run inline under the lock.
#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<Mutex<Store>>,
}

impl LocalBackend {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

fn map_err(operation: &'static str, err: pedalsync_store::Error) -> pedalsync_core::Error {
    match err {
        pedalsync_store::Error::SessionNotFound(id) => pedalsync_core::Error::SessionNotFound(id),
        other => pedalsync_core::Error::store(operation, other),
    }
}

#[async_trait]
impl SessionStore for LocalBackend {
    async fn create_session(&self, session: &NewSession) -> pedalsync_core::Result<()> {
        self.store
            .lock()
            .await
            .create_session(session)
            .map_err(|e| map_err("create_session", e))
    }

    async fn update_session(&self, snapshot: &SessionSnapshot) -> pedalsync_core::Result<()> {
        let result = self
            .store
            .lock()
            .await
            .update_session(snapshot)
            .map_err(|e| map_err("update_session", e))?;
        if result == UpdateResult::AlreadyFinalized {
            tracing::debug!("Progress for {} arrived after finalize", snapshot.session_id);
        }
        Ok(())
    }

    async fn finalize_session(&self, record: &SessionRecord) -> pedalsync_core::Result<()> {
        self.store
            .lock()
            .await
            .finalize_session(record)
            .map_err(|e| map_err("finalize_session", e))
    }

    async fn list_sessions(&self, user_id: &str) -> pedalsync_core::Result<Vec<SessionRecord>> {
        self.store
            .lock()
            .await
            .list_records(user_id)
            .map_err(|e| map_err("list_sessions", e))
    }
}

#[async_trait]
impl ProfileSource for LocalBackend {
    async fn user_weight_kg(&self, user_id: &str) -> pedalsync_core::Result<Option<f64>> {
        self.store
            .lock()
            .await
            .user_weight(user_id)
            .map_err(|e| map_err("user_weight_kg", e))
    }
}
