//! Bounded window of recent speed readings.

use std::collections::VecDeque;

/// Most-recent speeds, oldest dropped once the capacity is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedWindow {
    readings: VecDeque<f64>,
    capacity: usize,
}

impl SpeedWindow {
    /// Create an empty window. A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a speed, evicting the oldest one when full.
    pub fn push(&mut self, speed: f64) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(speed);
    }

    /// Arithmetic mean of the window, 0.0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.readings.iter().sum::<f64>() / self.readings.len() as f64
    }

    /// Largest speed in the window, never below 0.0.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.readings.iter().copied().fold(0.0, f64::max)
    }

    /// Number of speeds currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the window holds no speeds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Maximum number of speeds held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every speed.
    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().copied()
    }
}
