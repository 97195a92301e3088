//! Session payloads exchanged with the persistence backend.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::SessionId;

/// Payload used to create the backend record when a session starts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewSession {
    /// Session identifier, generated client-side.
    pub session_id: SessionId,
    /// Owner of the session.
    pub user_id: String,
    /// Wall-clock start of the session.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub started_at: OffsetDateTime,
    /// Body weight used for the calorie estimate.
    pub user_weight_kg: f64,
}

/// Partial progress pushed periodically while a session is active.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSnapshot {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// Seconds elapsed since the (possibly re-stamped) session start.
    pub duration_secs: u64,
    /// Protected cumulative distance in km.
    pub distance: f64,
    /// Protected cumulative pedal revolutions.
    pub cycles: u64,
    /// Estimated calories burned so far.
    pub calories: u32,
    /// Mean speed over the recent reading window, km/h.
    pub avg_speed: f64,
    /// Maximum speed over the recent reading window, km/h.
    pub max_speed: f64,
    /// When the snapshot was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub taken_at: OffsetDateTime,
}

impl SessionSnapshot {
    /// True when no distance, cycles or calories have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distance == 0.0 && self.cycles == 0 && self.calories == 0
    }
}

/// A finished session, handed to the backend when the session stops.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionRecord {
    /// Session identifier.
    pub session_id: SessionId,
    /// Owner of the session.
    pub user_id: String,
    /// Body weight the calorie estimate was computed with, kg.
    pub user_weight_kg: f64,
    /// Wall-clock start (after the last reset, if any).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub started_at: OffsetDateTime,
    /// Wall-clock end.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub ended_at: OffsetDateTime,
    /// Session duration in seconds.
    pub duration_secs: u64,
    /// Distance in km.
    pub distance: f64,
    /// Pedal revolutions.
    pub cycles: u64,
    /// Estimated calories burned.
    pub calories: u32,
    /// Mean speed over the final reading window, km/h.
    pub avg_speed: f64,
    /// Maximum speed over the final reading window, km/h.
    pub max_speed: f64,
}

impl SessionRecord {
    /// Whether the session covered any distance at all.
    ///
    /// Listings of past rides only show sessions where this holds.
    #[must_use]
    pub fn has_distance(&self) -> bool {
        self.distance > 0.0
    }
}

/// Totals across a set of finished sessions, as shown on a dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RideSummary {
    /// Number of sessions included.
    pub sessions: usize,
    /// Sum of distances in km.
    pub total_distance: f64,
    /// Sum of pedal revolutions.
    pub total_cycles: u64,
    /// Sum of calories.
    pub total_calories: u64,
    /// Sum of durations in seconds.
    pub total_duration_secs: u64,
    /// Longest single-session distance in km.
    pub longest_distance: f64,
    /// Best average speed of a single session, km/h.
    pub best_avg_speed: f64,
}

impl RideSummary {
    /// Aggregate a slice of finished sessions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pedalsync_types::RideSummary;
    ///
    /// let summary = RideSummary::from_records(&[]);
    /// assert_eq!(summary.sessions, 0);
    /// assert_eq!(summary.total_distance, 0.0);
    /// ```
    #[must_use]
    pub fn from_records(records: &[SessionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.sessions += 1;
            acc.total_distance += r.distance;
            acc.total_cycles += r.cycles;
            acc.total_calories += u64::from(r.calories);
            acc.total_duration_secs += r.duration_secs;
            acc.longest_distance = acc.longest_distance.max(r.distance);
            acc.best_avg_speed = acc.best_avg_speed.max(r.avg_speed);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(distance: f64, calories: u32, avg_speed: f64) -> SessionRecord {
        let now = OffsetDateTime::now_utc();
        SessionRecord {
            session_id: SessionId::new(),
            user_id: "rider".to_string(),
            user_weight_kg: 70.0,
            started_at: now,
            ended_at: now,
            duration_secs: 600,
            distance,
            cycles: 100,
            calories,
            avg_speed,
            max_speed: avg_speed * 1.5,
        }
    }

    #[test]
    fn test_summary_totals() {
        let summary =
            RideSummary::from_records(&[record(5.0, 80, 18.0), record(12.5, 200, 22.0)]);

        assert_eq!(summary.sessions, 2);
        assert!((summary.total_distance - 17.5).abs() < 1e-9);
        assert_eq!(summary.total_cycles, 200);
        assert_eq!(summary.total_calories, 280);
        assert_eq!(summary.total_duration_secs, 1200);
        assert_eq!(summary.longest_distance, 12.5);
        assert_eq!(summary.best_avg_speed, 22.0);
    }

    #[test]
    fn test_has_distance() {
        assert!(record(0.1, 0, 0.0).has_distance());
        assert!(!record(0.0, 0, 0.0).has_distance());
    }

    #[test]
    fn test_snapshot_is_empty() {
        let snapshot = SessionSnapshot {
            session_id: SessionId::new(),
            duration_secs: 30,
            distance: 0.0,
            cycles: 0,
            calories: 0,
            avg_speed: 0.0,
            max_speed: 0.0,
            taken_at: OffsetDateTime::now_utc(),
        };
        assert!(snapshot.is_empty());
        assert!(!SessionSnapshot { cycles: 1, ..snapshot }.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_record_json_uses_rfc3339() {
        let json = serde_json::to_value(record(1.0, 10, 15.0)).unwrap();
        let started = json["started_at"].as_str().unwrap();
        assert!(started.contains('T'));
    }
}
