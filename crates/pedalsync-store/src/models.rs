//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use pedalsync_types::{SessionId, SessionRecord};

/// A session row.
///
/// Timestamps are stored with one-second resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Owner of the session.
    pub user_id: String,
    /// When the session started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the session ended, once finalized.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    /// Weight the calorie estimate was based on.
    pub weight_kg: f64,
    /// Duration in seconds (so far, while active).
    pub duration_secs: u64,
    /// Distance in km.
    pub distance: f64,
    /// Pedal revolutions.
    pub cycles: u64,
    /// Calorie estimate.
    pub calories: u32,
    /// Average speed over the recent window, km/h.
    pub avg_speed: f64,
    /// Maximum speed over the recent window, km/h.
    pub max_speed: f64,
    /// Whether the final record has been written.
    pub finalized: bool,
    /// Last write to this row.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StoredSession {
    /// The finished record, if the session was finalized.
    pub fn to_record(&self) -> Option<SessionRecord> {
        if !self.finalized {
            return None;
        }
        Some(SessionRecord {
            session_id: self.session_id,
            user_id: self.user_id.clone(),
            user_weight_kg: self.weight_kg,
            started_at: self.started_at,
            ended_at: self.ended_at.unwrap_or(self.updated_at),
            duration_secs: self.duration_secs,
            distance: self.distance,
            cycles: self.cycles,
            calories: self.calories,
            avg_speed: self.avg_speed,
            max_speed: self.max_speed,
        })
    }
}

/// A rider profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    /// User identifier.
    pub user_id: String,
    /// Body weight in kg.
    pub weight_kg: f64,
    /// When the weight was last set.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Flat CSV row for exports.
#[derive(Debug, Serialize)]
pub(crate) struct SessionCsvRow<'a> {
    pub session_id: String,
    pub user_id: &'a str,
    pub started_at: String,
    pub ended_at: String,
    pub duration_secs: u64,
    pub distance_km: f64,
    pub cycles: u64,
    pub calories: u32,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub finalized: bool,
}

impl<'a> SessionCsvRow<'a> {
    pub(crate) fn new(session: &'a StoredSession) -> Self {
        use time::format_description::well_known::Rfc3339;
        let format = |t: OffsetDateTime| t.format(&Rfc3339).unwrap_or_default();
        Self {
            session_id: session.session_id.to_string(),
            user_id: &session.user_id,
            started_at: format(session.started_at),
            ended_at: session.ended_at.map(format).unwrap_or_default(),
            duration_secs: session.duration_secs,
            distance_km: session.distance,
            cycles: session.cycles,
            calories: session.calories,
            avg_speed_kmh: session.avg_speed,
            max_speed_kmh: session.max_speed,
            finalized: session.finalized,
        }
    }
}
