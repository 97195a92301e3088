//! Session aggregation over raw sensor totals.
//!
//! The sensor reports cumulative distance and revolution counters that may
//! jump back to zero whenever the hardware resets. [`SessionAggregator`]
//! turns that stream into totals that never decrease within a session, and
//! derives calories from active pedaling time.
//!
//! All operations take the current monotonic instant explicitly (the `*_at`
//! methods) so callers and tests control time. The wall-clock start is read
//! once when a session begins; every later wall-clock value is derived from
//! it plus monotonic elapsed time.
//!
//! # Hardware resets
//!
//! A reading with `distance == 0` while the stored distance is positive, or
//! `cycles == 0` while stored cycles are positive, is treated as a device
//! counter reset rather than a regression. This heuristic can misfire if a
//! device legitimately reports zero distance mid-session; it is kept as-is.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use pedalsync_types::{ReadingError, SessionId, SessionReading, SessionRecord};

use crate::calories::CalorieModel;
use crate::config::SessionConfig;
use crate::window::SpeedWindow;

/// Live totals of the active session.
#[derive(Debug, Clone)]
pub struct ActiveSessionTotals {
    /// Session identifier.
    pub session_id: SessionId,
    /// Owner of the session.
    pub user_id: String,
    /// Wall-clock start, re-stamped on every reset.
    pub started_at: OffsetDateTime,
    /// Monotonic start, re-stamped on every reset.
    pub started: Instant,
    /// Speed of the last reading (km/h). Allowed to fall to zero.
    pub current_speed: f64,
    /// Cadence of the last reading, if reported.
    pub current_rpm: Option<f64>,
    /// Protected cumulative distance (km).
    pub current_distance: f64,
    /// Protected cumulative pedal revolutions.
    pub current_cycles: u64,
    /// Protected calorie estimate.
    pub current_calories: u32,
    /// Time accumulated while the reported speed was above zero.
    pub cycling_time: Duration,
    /// Recent speeds for avg/max.
    pub speed_window: SpeedWindow,
    /// Weight captured at session start.
    pub user_weight_kg: f64,
    /// Number of resets (hardware or manual) within this session.
    pub resets: u32,
    last_update: Instant,
    anchor_wall: OffsetDateTime,
    anchor: Instant,
}

impl ActiveSessionTotals {
    fn new(
        session_id: SessionId,
        user_id: String,
        user_weight_kg: f64,
        window: usize,
        now: Instant,
    ) -> Self {
        let wall = OffsetDateTime::now_utc();
        Self {
            session_id,
            user_id,
            started_at: wall,
            started: now,
            current_speed: 0.0,
            current_rpm: None,
            current_distance: 0.0,
            current_cycles: 0,
            current_calories: 0,
            cycling_time: Duration::ZERO,
            speed_window: SpeedWindow::new(window),
            user_weight_kg,
            resets: 0,
            last_update: now,
            anchor_wall: wall,
            anchor: now,
        }
    }

    /// Time elapsed since the (possibly re-stamped) start.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Wall-clock time corresponding to a monotonic instant of this session.
    #[must_use]
    pub fn wall_at(&self, now: Instant) -> OffsetDateTime {
        let since_anchor = now.saturating_duration_since(self.anchor);
        self.anchor_wall + since_anchor
    }

    /// Whether nothing has been counted since the start or the last reset.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.current_distance == 0.0 && self.current_cycles == 0 && self.current_calories == 0
    }

    fn zero(&mut self, now: Instant) {
        self.current_speed = 0.0;
        self.current_rpm = None;
        self.current_distance = 0.0;
        self.current_cycles = 0;
        self.current_calories = 0;
        self.cycling_time = Duration::ZERO;
        self.speed_window.clear();
        self.started_at = self.wall_at(now);
        self.started = now;
        self.last_update = now;
        self.resets += 1;
    }

    fn finalize(self, now: Instant) -> SessionRecord {
        SessionRecord {
            session_id: self.session_id,
            user_id: self.user_id.clone(),
            user_weight_kg: self.user_weight_kg,
            started_at: self.started_at,
            ended_at: self.wall_at(now),
            duration_secs: self.elapsed(now).as_secs(),
            distance: self.current_distance,
            cycles: self.current_cycles,
            calories: self.current_calories,
            avg_speed: self.speed_window.mean(),
            max_speed: self.speed_window.max(),
        }
    }
}

/// Result of feeding one reading to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No session is active; the reading was discarded.
    Ignored,
    /// The reading failed validation; totals are unchanged.
    Rejected(ReadingError),
    /// The device counters reverted to zero; totals were reset and the rest
    /// of the reading was not applied.
    HardwareReset,
    /// The reading was applied.
    Applied,
}

/// Converts resettable sensor counters into a monotonic session record.
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    active: Option<ActiveSessionTotals>,
    calories: CalorieModel,
    window: usize,
    default_weight_kg: f64,
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl SessionAggregator {
    /// Create an idle aggregator.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            active: None,
            calories: CalorieModel::new(config.met),
            window: config.speed_window,
            default_weight_kg: config.default_weight_kg,
        }
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Totals of the active session.
    pub fn totals(&self) -> Option<&ActiveSessionTotals> {
        self.active.as_ref()
    }

    /// Pick the weight for a new session, falling back to the default when
    /// the supplied value is missing or not a positive number.
    pub fn resolve_weight(&self, weight_kg: Option<f64>) -> f64 {
        match weight_kg {
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(w) => {
                warn!(
                    "Ignoring invalid weight {} kg, using {} kg",
                    w, self.default_weight_kg
                );
                self.default_weight_kg
            }
            None => self.default_weight_kg,
        }
    }

    /// Start a session at `now`.
    ///
    /// An already-active session is finalized first and returned.
    pub fn start_at(
        &mut self,
        session_id: SessionId,
        user_id: impl Into<String>,
        weight_kg: Option<f64>,
        now: Instant,
    ) -> Option<SessionRecord> {
        let previous = self.stop_at(now);
        let weight = self.resolve_weight(weight_kg);
        let user_id = user_id.into();
        info!(
            "Session {} started for {} ({} kg)",
            session_id, user_id, weight
        );
        self.active = Some(ActiveSessionTotals::new(
            session_id,
            user_id,
            weight,
            self.window,
            now,
        ));
        previous
    }

    /// Start a session now.
    pub fn start(
        &mut self,
        session_id: SessionId,
        user_id: impl Into<String>,
        weight_kg: Option<f64>,
    ) -> Option<SessionRecord> {
        self.start_at(session_id, user_id, weight_kg, Instant::now())
    }

    /// Apply one sensor reading received at `now`.
    pub fn update_at(&mut self, reading: &SessionReading, now: Instant) -> UpdateOutcome {
        let Some(totals) = self.active.as_mut() else {
            return UpdateOutcome::Ignored;
        };

        if let Err(e) = reading.validate() {
            warn!("Dropping invalid reading for {}: {}", totals.session_id, e);
            return UpdateOutcome::Rejected(e);
        }

        let distance_reset = reading.distance == 0.0 && totals.current_distance > 0.0;
        let cycles_reset = reading.cycles == 0 && totals.current_cycles > 0;
        if distance_reset || cycles_reset {
            info!(
                "Hardware counter reset detected for {} (distance {} -> 0, cycles {} -> {})",
                totals.session_id, totals.current_distance, totals.current_cycles, reading.cycles
            );
            totals.zero(now);
            return UpdateOutcome::HardwareReset;
        }

        let delta = now.saturating_duration_since(totals.last_update);
        totals.last_update = now;
        if reading.is_moving() {
            totals.cycling_time += delta;
        }

        totals.current_speed = reading.speed;
        totals.current_rpm = reading.rpm;
        totals.current_distance = reading.distance.max(totals.current_distance);
        totals.current_cycles = reading.cycles.max(totals.current_cycles);
        totals.speed_window.push(reading.speed);

        let calories = self
            .calories
            .calories(totals.user_weight_kg, totals.cycling_time);
        totals.current_calories = calories.max(totals.current_calories);

        debug!(
            "Session {}: speed={:.1} distance={:.3} cycles={} calories={}",
            totals.session_id,
            totals.current_speed,
            totals.current_distance,
            totals.current_cycles,
            totals.current_calories
        );
        UpdateOutcome::Applied
    }

    /// Apply one sensor reading received now.
    pub fn update(&mut self, reading: &SessionReading) -> UpdateOutcome {
        self.update_at(reading, Instant::now())
    }

    /// Zero every counter of the active session at `now` while keeping it
    /// active. Returns `false` when no session is active.
    pub fn reset_at(&mut self, now: Instant) -> bool {
        match self.active.as_mut() {
            Some(totals) => {
                info!("Session {} counters reset", totals.session_id);
                totals.zero(now);
                true
            }
            None => false,
        }
    }

    /// Zero every counter of the active session now.
    pub fn reset(&mut self) -> bool {
        self.reset_at(Instant::now())
    }

    /// Finalize the active session at `now`. Idempotent: returns `None` when
    /// no session is active.
    pub fn stop_at(&mut self, now: Instant) -> Option<SessionRecord> {
        let totals = self.active.take()?;
        let record = totals.finalize(now);
        info!(
            "Session {} finished: {}s, {:.3} km, {} cycles, {} kcal",
            record.session_id, record.duration_secs, record.distance, record.cycles, record.calories
        );
        Some(record)
    }

    /// Finalize the active session now.
    pub fn stop(&mut self) -> Option<SessionRecord> {
        self.stop_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(t0: Instant) -> SessionAggregator {
        let mut agg = SessionAggregator::default();
        agg.start_at(SessionId::new(), "rider", Some(70.0), t0);
        agg
    }

    fn r(speed: f64, distance: f64, cycles: u64) -> SessionReading {
        SessionReading::new(speed, distance, cycles)
    }

    #[test]
    fn test_update_without_session_is_ignored() {
        let mut agg = SessionAggregator::default();
        assert_eq!(agg.update(&r(10.0, 1.0, 10)), UpdateOutcome::Ignored);
        assert!(agg.totals().is_none());
    }

    #[test]
    fn test_non_decreasing_readings_are_copied_exactly() {
        let t0 = Instant::now();
        let mut agg = started(t0);

        let readings = [r(10.0, 0.1, 20), r(12.0, 0.25, 55), r(11.0, 0.4, 90)];
        for (i, reading) in readings.iter().enumerate() {
            let outcome = agg.update_at(reading, t0 + Duration::from_secs(i as u64 + 1));
            assert_eq!(outcome, UpdateOutcome::Applied);
        }

        let totals = agg.totals().unwrap();
        assert_eq!(totals.current_distance, 0.4);
        assert_eq!(totals.current_cycles, 90);
        assert_eq!(totals.current_speed, 11.0);
    }

    #[test]
    fn test_partial_regression_is_floored() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        agg.update_at(&r(10.0, 2.0, 100), t0 + Duration::from_secs(1));
        agg.update_at(&r(9.0, 1.5, 80), t0 + Duration::from_secs(2));

        let totals = agg.totals().unwrap();
        assert_eq!(totals.current_distance, 2.0);
        assert_eq!(totals.current_cycles, 100);
        assert_eq!(totals.current_speed, 9.0);
    }

    #[test]
    fn test_zero_distance_after_progress_resets() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        agg.update_at(&r(20.0, 1.0, 50), t0 + Duration::from_secs(60));

        let reset_time = t0 + Duration::from_secs(61);
        let outcome = agg.update_at(&r(20.0, 0.0, 51), reset_time);
        assert_eq!(outcome, UpdateOutcome::HardwareReset);

        let totals = agg.totals().unwrap();
        assert_eq!(totals.current_distance, 0.0);
        assert_eq!(totals.current_cycles, 0);
        assert_eq!(totals.current_calories, 0);
        assert_eq!(totals.current_speed, 0.0);
        assert_eq!(totals.cycling_time, Duration::ZERO);
        assert!(totals.speed_window.is_empty());
        assert!(totals.started >= reset_time);
        assert_eq!(totals.resets, 1);
    }

    #[test]
    fn test_zero_cycles_alone_triggers_reset() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        agg.update_at(&r(20.0, 1.0, 50), t0 + Duration::from_secs(1));
        let outcome = agg.update_at(&r(20.0, 1.1, 0), t0 + Duration::from_secs(2));
        assert_eq!(outcome, UpdateOutcome::HardwareReset);
        assert_eq!(agg.totals().unwrap().current_distance, 0.0);
    }

    #[test]
    fn test_zero_reading_on_blank_session_is_applied() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let outcome = agg.update_at(&r(0.0, 0.0, 0), t0 + Duration::from_secs(1));
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert_eq!(agg.totals().unwrap().resets, 0);
    }

    #[test]
    fn test_reset_restamps_wall_clock_start() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let first_start = agg.totals().unwrap().started_at;
        agg.update_at(&r(20.0, 1.0, 50), t0 + Duration::from_secs(30));
        agg.update_at(&r(20.0, 0.0, 0), t0 + Duration::from_secs(90));

        let totals = agg.totals().unwrap();
        assert_eq!(totals.started_at, first_start + Duration::from_secs(90));
    }

    #[test]
    fn test_cycling_time_only_counts_moving_intervals() {
        let t0 = Instant::now();
        let mut agg = started(t0);

        agg.update_at(&r(15.0, 0.1, 10), t0 + Duration::from_secs(10)); // +10 moving
        agg.update_at(&r(0.0, 0.1, 10), t0 + Duration::from_secs(40)); // +30 stopped
        agg.update_at(&r(18.0, 0.2, 30), t0 + Duration::from_secs(45)); // +5 moving

        assert_eq!(agg.totals().unwrap().cycling_time, Duration::from_secs(15));
    }

    #[test]
    fn test_ten_minutes_of_pedaling_burns_86_kcal() {
        let t0 = Instant::now();
        let mut agg = started(t0);

        for second in 1..=600u64 {
            let reading = r(20.0, second as f64 * 0.005, second * 2);
            agg.update_at(&reading, t0 + Duration::from_secs(second));
        }

        let totals = agg.totals().unwrap();
        assert_eq!(totals.cycling_time, Duration::from_secs(600));
        assert_eq!(totals.current_calories, 86);
    }

    #[test]
    fn test_calories_never_drop_between_updates() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let mut last = 0;
        for second in 1..=120u64 {
            let speed = if second % 3 == 0 { 0.0 } else { 22.0 };
            agg.update_at(&r(speed, 1.0, 100), t0 + Duration::from_secs(second));
            let calories = agg.totals().unwrap().current_calories;
            assert!(calories >= last);
            last = calories;
        }
        assert!(last > 0);
    }

    #[test]
    fn test_speed_window_is_bounded() {
        let config = SessionConfig::builder().speed_window(3).build();
        let mut agg = SessionAggregator::new(&config);
        let t0 = Instant::now();
        agg.start_at(SessionId::new(), "rider", None, t0);

        for (i, speed) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            agg.update_at(&r(speed, 1.0, 10), t0 + Duration::from_secs(i as u64 + 1));
        }

        let window = &agg.totals().unwrap().speed_window;
        assert_eq!(window.len(), 3);
        assert!(!window.iter().any(|s| s == 10.0));
    }

    #[test]
    fn test_invalid_reading_is_rejected() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        agg.update_at(&r(10.0, 1.0, 10), t0 + Duration::from_secs(1));

        let outcome = agg.update_at(&r(f64::NAN, 5.0, 50), t0 + Duration::from_secs(2));
        assert!(matches!(outcome, UpdateOutcome::Rejected(_)));
        assert_eq!(agg.totals().unwrap().current_distance, 1.0);
    }

    #[test]
    fn test_missing_weight_defaults_to_seventy() {
        let mut agg = SessionAggregator::default();
        agg.start(SessionId::new(), "rider", None);
        assert_eq!(agg.totals().unwrap().user_weight_kg, 70.0);

        agg.start(SessionId::new(), "rider", Some(-3.0));
        assert_eq!(agg.totals().unwrap().user_weight_kg, 70.0);

        agg.start(SessionId::new(), "rider", Some(82.5));
        assert_eq!(agg.totals().unwrap().user_weight_kg, 82.5);
    }

    #[test]
    fn test_start_while_active_finalizes_previous() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let first_id = agg.totals().unwrap().session_id;
        agg.update_at(&r(10.0, 0.5, 40), t0 + Duration::from_secs(5));

        let previous = agg.start_at(SessionId::new(), "rider", None, t0 + Duration::from_secs(8));
        let previous = previous.unwrap();
        assert_eq!(previous.session_id, first_id);
        assert_eq!(previous.distance, 0.5);
        assert_eq!(previous.duration_secs, 8);
        assert_eq!(agg.totals().unwrap().current_distance, 0.0);
    }

    #[test]
    fn test_stop_computes_final_stats() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        for (i, speed) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            agg.update_at(
                &r(speed, (i + 1) as f64, (i as u64 + 1) * 10),
                t0 + Duration::from_secs(i as u64 + 1),
            );
        }

        let record = agg.stop_at(t0 + Duration::from_secs(125)).unwrap();
        assert_eq!(record.duration_secs, 125);
        assert_eq!(record.avg_speed, 20.0);
        assert_eq!(record.max_speed, 30.0);
        assert_eq!(record.distance, 3.0);
        assert_eq!(record.cycles, 30);
        assert_eq!(
            record.ended_at - record.started_at,
            time::Duration::seconds(125)
        );
        assert!(!agg.is_active());
    }

    #[test]
    fn test_stop_with_no_readings_has_zero_speeds() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let record = agg.stop_at(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(record.avg_speed, 0.0);
        assert_eq!(record.max_speed, 0.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut agg = SessionAggregator::default();
        assert!(agg.stop().is_none());
        agg.start(SessionId::new(), "rider", None);
        assert!(agg.stop().is_some());
        assert!(agg.stop().is_none());
    }

    #[test]
    fn test_manual_reset_keeps_session_active() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let id = agg.totals().unwrap().session_id;
        agg.update_at(&r(25.0, 3.0, 300), t0 + Duration::from_secs(60));

        assert!(agg.reset_at(t0 + Duration::from_secs(70)));

        let totals = agg.totals().unwrap();
        assert_eq!(totals.session_id, id);
        assert!(totals.is_blank());
        assert_eq!(totals.started, t0 + Duration::from_secs(70));

        // A fresh low reading after a manual reset is taken as-is.
        agg.update_at(&r(25.0, 0.2, 15), t0 + Duration::from_secs(75));
        assert_eq!(agg.totals().unwrap().current_distance, 0.2);
    }

    #[test]
    fn test_reset_without_session() {
        let mut agg = SessionAggregator::default();
        assert!(!agg.reset());
    }

    #[test]
    fn test_reset_scenario_keeps_only_post_reset_values() {
        let t0 = Instant::now();
        let mut agg = started(t0);
        let stream = [
            r(0.0, 0.0, 0),
            r(15.0, 1.0, 50),
            r(15.0, 2.0, 100),
            r(0.0, 0.0, 0),
            r(12.0, 0.5, 20),
        ];

        let mut outcomes = Vec::new();
        for (i, reading) in stream.iter().enumerate() {
            outcomes.push(agg.update_at(reading, t0 + Duration::from_secs(10 * (i as u64 + 1))));
        }

        assert_eq!(outcomes[3], UpdateOutcome::HardwareReset);
        let totals = agg.totals().unwrap();
        assert_eq!(totals.current_distance, 0.5);
        assert_eq!(totals.current_cycles, 20);
        assert_eq!(totals.started, t0 + Duration::from_secs(40));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// With counters that never fall back to zero, protected totals never
        /// decrease, whatever order the values arrive in.
        #[test]
        fn totals_never_decrease_without_reset(
            steps in proptest::collection::vec((0.0f64..60.0, 0.001f64..100.0, 1u64..10_000, 1u64..5_000), 1..80)
        ) {
            let t0 = Instant::now();
            let mut agg = SessionAggregator::default();
            agg.start_at(SessionId::new(), "rider", Some(75.0), t0);

            let mut now = t0;
            let mut prev = (0.0f64, 0u64, 0u32);
            for (speed, distance, cycles, gap_ms) in steps {
                now += Duration::from_millis(gap_ms);
                let outcome = agg.update_at(&SessionReading::new(speed, distance, cycles), now);
                prop_assert_eq!(outcome, UpdateOutcome::Applied);

                let t = agg.totals().unwrap();
                prop_assert!(t.current_distance >= prev.0);
                prop_assert!(t.current_cycles >= prev.1);
                prop_assert!(t.current_calories >= prev.2);
                prev = (t.current_distance, t.current_cycles, t.current_calories);
            }
        }

        /// The speed window never grows beyond its capacity.
        #[test]
        fn window_respects_capacity(capacity in 1usize..20, pushes in 0usize..100) {
            let config = SessionConfig::builder().speed_window(capacity).build();
            let mut agg = SessionAggregator::new(&config);
            let t0 = Instant::now();
            agg.start_at(SessionId::new(), "rider", None, t0);
            for i in 0..pushes {
                agg.update_at(
                    &SessionReading::new(10.0, 1.0, 1),
                    t0 + Duration::from_secs(i as u64),
                );
            }
            prop_assert!(agg.totals().unwrap().speed_window.len() <= capacity);
        }
    }
}
