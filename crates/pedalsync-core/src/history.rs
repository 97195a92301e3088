//! Finished-session queries over a [`SessionStore`].

use pedalsync_types::{RideSummary, SessionRecord};

use crate::error::Result;
use crate::traits::SessionStore;

/// A user's finished sessions that covered any distance, newest first.
///
/// Sessions stopped before the wheel turned are left out; they are noise
/// on a history screen.
pub async fn completed_sessions(
    store: &dyn SessionStore,
    user_id: &str,
) -> Result<Vec<SessionRecord>> {
    let mut records = store.list_sessions(user_id).await?;
    records.retain(SessionRecord::has_distance);
    records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(records)
}

/// Dashboard totals over [`completed_sessions`].
pub async fn ride_summary(store: &dyn SessionStore, user_id: &str) -> Result<RideSummary> {
    let records = completed_sessions(store, user_id).await?;
    Ok(RideSummary::from_records(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use pedalsync_types::{NewSession, SessionId};
    use time::OffsetDateTime;

    async fn finish(store: &MemoryStore, user: &str, age_mins: i64, distance: f64) -> SessionId {
        let started_at = OffsetDateTime::now_utc() - time::Duration::minutes(age_mins);
        let session = NewSession {
            session_id: SessionId::new(),
            user_id: user.to_string(),
            started_at,
            user_weight_kg: 70.0,
        };
        store.create_session(&session).await.unwrap();
        store
            .finalize_session(&SessionRecord {
                session_id: session.session_id,
                user_id: user.to_string(),
                user_weight_kg: 70.0,
                started_at,
                ended_at: started_at + time::Duration::minutes(20),
                duration_secs: 1200,
                distance,
                cycles: (distance * 400.0) as u64,
                calories: 100,
                avg_speed: 18.0,
                max_speed: 30.0,
            })
            .await
            .unwrap();
        session.session_id
    }

    #[tokio::test]
    async fn test_completed_sessions_drops_zero_distance() {
        let store = MemoryStore::new();
        let older = finish(&store, "rider", 120, 5.0).await;
        finish(&store, "rider", 60, 0.0).await;
        let newer = finish(&store, "rider", 10, 2.5).await;
        finish(&store, "someone-else", 5, 9.0).await;

        let ids: Vec<SessionId> = completed_sessions(&store, "rider")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_ride_summary() {
        let store = MemoryStore::new();
        finish(&store, "rider", 30, 4.0).await;
        finish(&store, "rider", 20, 6.0).await;
        finish(&store, "rider", 10, 0.0).await;

        let summary = ride_summary(&store, "rider").await.unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.total_distance, 10.0);
        assert_eq!(summary.longest_distance, 6.0);
        assert_eq!(summary.total_calories, 200);
    }
}
