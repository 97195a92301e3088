//! Tunables for live sessions.
//!
//! Use the builder for convenient configuration:
//!
//! ```
//! use std::time::Duration;
//! use pedalsync_core::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .sync_interval(Duration::from_secs(10))
//!     .speed_window(120)
//!     .build();
//! config.validate().unwrap();
//! ```

use std::time::Duration;

use crate::calories::CYCLING_MET;
use crate::error::{Error, Result};

/// Body weight used when the profile lookup has nothing.
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// Number of recent speed readings kept for avg/max speed.
pub const DEFAULT_SPEED_WINDOW: usize = 60;

/// Cadence of the periodic backend sync.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a [`SessionController`](crate::SessionController).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often progress is pushed to the backend while a session runs.
    /// Default: 5 seconds.
    pub sync_interval: Duration,
    /// Capacity of the recent speed window. Default: 60 readings.
    pub speed_window: usize,
    /// Weight used when none is supplied or found. Default: 70 kg.
    pub default_weight_kg: f64,
    /// Metabolic equivalent used by the calorie model. Default: 7.0.
    pub met: f64,
    /// Capacity of the event broadcast channel. Default: 100.
    pub event_capacity: usize,
    /// Capacity of the controller command channel. Default: 16.
    pub command_buffer: usize,
    /// Stop the active session when the reading stream ends. Default: true.
    pub stop_on_disconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            speed_window: DEFAULT_SPEED_WINDOW,
            default_weight_kg: DEFAULT_WEIGHT_KG,
            met: CYCLING_MET,
            event_capacity: 100,
            command_buffer: 16,
            stop_on_disconnect: true,
        }
    }
}

impl SessionConfig {
    /// Create a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// Checks that:
    /// - `sync_interval` is > 0
    /// - `speed_window`, `event_capacity` and `command_buffer` are > 0
    /// - `default_weight_kg` and `met` are finite and > 0
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval.is_zero() {
            return Err(Error::invalid_config("sync_interval must be > 0"));
        }
        if self.speed_window == 0 {
            return Err(Error::invalid_config("speed_window must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        if self.command_buffer == 0 {
            return Err(Error::invalid_config("command_buffer must be > 0"));
        }
        if !(self.default_weight_kg.is_finite() && self.default_weight_kg > 0.0) {
            return Err(Error::invalid_config(format!(
                "default_weight_kg must be a positive number, got {}",
                self.default_weight_kg
            )));
        }
        if !(self.met.is_finite() && self.met > 0.0) {
            return Err(Error::invalid_config(format!(
                "met must be a positive number, got {}",
                self.met
            )));
        }
        Ok(())
    }
}

/// Builder for SessionConfig.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the backend sync interval.
    #[must_use]
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = interval;
        self
    }

    /// Set the speed window capacity.
    #[must_use]
    pub fn speed_window(mut self, capacity: usize) -> Self {
        self.config.speed_window = capacity;
        self
    }

    /// Set the fallback body weight.
    #[must_use]
    pub fn default_weight_kg(mut self, weight: f64) -> Self {
        self.config.default_weight_kg = weight;
        self
    }

    /// Set the MET value used for calories.
    #[must_use]
    pub fn met(mut self, met: f64) -> Self {
        self.config.met = met;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.config.command_buffer = capacity;
        self
    }

    /// Set whether a closed reading stream stops the active session.
    #[must_use]
    pub fn stop_on_disconnect(mut self, stop: bool) -> Self {
        self.config.stop_on_disconnect = stop;
        self
    }

    /// Build the SessionConfig.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.speed_window, 60);
        assert_eq!(config.default_weight_kg, 70.0);
        assert_eq!(config.met, 7.0);
        assert!(config.stop_on_disconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_partial() {
        let config = SessionConfig::builder()
            .speed_window(10)
            .stop_on_disconnect(false)
            .build();

        assert_eq!(config.speed_window, 10);
        assert!(!config.stop_on_disconnect);
        assert_eq!(config.sync_interval, Duration::from_secs(5)); // default
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        let config = SessionConfig::builder()
            .sync_interval(Duration::ZERO)
            .build();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_zero_window() {
        let config = SessionConfig::builder().speed_window(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_weight_and_met() {
        assert!(SessionConfig::builder()
            .default_weight_kg(f64::NAN)
            .build()
            .validate()
            .is_err());
        assert!(SessionConfig::builder()
            .default_weight_kg(-5.0)
            .build()
            .validate()
            .is_err());
        assert!(SessionConfig::builder().met(0.0).build().validate().is_err());
    }
}
