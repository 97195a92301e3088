//! Core types for live sensor readings.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReadingError, ReadingResult};

/// Identifier of a riding session, shared with the persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One payload delivered by the sensor transport.
///
/// `distance` and `cycles` are cumulative counters maintained by the device
/// itself. They normally only grow, but a device may revert them to zero at
/// any time (a hardware reset).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionReading {
    /// Instantaneous speed in km/h.
    pub speed: f64,
    /// Cumulative distance in km as reported by the device.
    pub distance: f64,
    /// Cumulative pedal revolutions as reported by the device.
    pub cycles: u64,
    /// Cadence in revolutions per minute, when the device reports it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rpm: Option<f64>,
}

impl SessionReading {
    /// Create a reading without cadence.
    #[must_use]
    pub const fn new(speed: f64, distance: f64, cycles: u64) -> Self {
        Self {
            speed,
            distance,
            cycles,
            rpm: None,
        }
    }

    /// Attach a cadence value.
    #[must_use]
    pub const fn with_rpm(mut self, rpm: f64) -> Self {
        self.rpm = Some(rpm);
        self
    }

    /// Check that every numeric field is finite and non-negative.
    ///
    /// # Examples
    ///
    /// ```
    /// use pedalsync_types::SessionReading;
    ///
    /// assert!(SessionReading::new(12.5, 1.2, 300).validate().is_ok());
    /// assert!(SessionReading::new(-1.0, 1.2, 300).validate().is_err());
    /// assert!(SessionReading::new(f64::NAN, 0.0, 0).validate().is_err());
    /// ```
    pub fn validate(&self) -> ReadingResult<()> {
        check_non_negative("speed", self.speed)?;
        check_non_negative("distance", self.distance)?;
        if let Some(rpm) = self.rpm {
            check_non_negative("rpm", rpm)?;
        }
        Ok(())
    }

    /// Whether the rider is moving according to this reading.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.speed > 0.0
    }
}

fn check_non_negative(field: &'static str, value: f64) -> ReadingResult<()> {
    if !value.is_finite() {
        return Err(ReadingError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(ReadingError::Negative { field, value });
    }
    Ok(())
}
