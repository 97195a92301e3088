//! MET-based calorie estimate.
//!
//! Calories are derived from active pedaling time only, never from wall-clock
//! session time:
//!
//! ```text
//! kcal/min = MET * weight_kg * 0.0175
//! kcal     = round(kcal/min * active_ms / 60000)
//! ```

use std::time::Duration;

/// MET value for moderate cycling.
pub const CYCLING_MET: f64 = 7.0;

/// kcal burned per kg of body weight per minute at 1 MET.
pub const KCAL_PER_KG_MINUTE: f64 = 0.0175;

/// Calorie estimator for a fixed MET value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieModel {
    met: f64,
}

impl Default for CalorieModel {
    fn default() -> Self {
        Self::new(CYCLING_MET)
    }
}

impl CalorieModel {
    /// Create a model for the given MET value.
    #[must_use]
    pub const fn new(met: f64) -> Self {
        Self { met }
    }

    /// The MET value in use.
    #[must_use]
    pub const fn met(&self) -> f64 {
        self.met
    }

    /// Calories burned per minute of activity at this body weight.
    #[must_use]
    pub fn per_minute(&self, weight_kg: f64) -> f64 {
        self.met * weight_kg * KCAL_PER_KG_MINUTE
    }

    /// Total calories for the given amount of active pedaling time.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use pedalsync_core::CalorieModel;
    ///
    /// let model = CalorieModel::default();
    /// assert_eq!(model.calories(70.0, Duration::from_secs(600)), 86);
    /// ```
    #[must_use]
    pub fn calories(&self, weight_kg: f64, active: Duration) -> u32 {
        let minutes = active.as_millis() as f64 / 60_000.0;
        let kcal = (self.per_minute(weight_kg) * minutes).round();
        if kcal.is_finite() && kcal > 0.0 {
            kcal.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_minute() {
        let model = CalorieModel::default();
        assert!((model.per_minute(70.0) - 8.575).abs() < 1e-9);
    }

    #[test]
    fn test_ten_minutes_at_seventy_kg() {
        let model = CalorieModel::default();
        assert_eq!(model.calories(70.0, Duration::from_secs(10 * 60)), 86);
    }

    #[test]
    fn test_zero_time_is_zero() {
        assert_eq!(CalorieModel::default().calories(90.0, Duration::ZERO), 0);
    }

    #[test]
    fn test_rounding_uses_milliseconds() {
        // 8.575 kcal/min * 0.5 min = 4.2875 -> 4
        let model = CalorieModel::default();
        assert_eq!(model.calories(70.0, Duration::from_millis(30_000)), 4);
        // 8.575 * (35/60) = 5.002 -> 5
        assert_eq!(model.calories(70.0, Duration::from_millis(35_000)), 5);
    }

    #[test]
    fn test_custom_met() {
        let model = CalorieModel::new(10.0);
        // 10 * 80 * 0.0175 = 14 kcal/min
        assert_eq!(model.calories(80.0, Duration::from_secs(60)), 14);
    }
}
