//! Mock sensor transport for testing.
//!
//! This module provides a scripted transport that can be used for unit
//! testing and demos without any sensor hardware.
//!
//! The [`MockTransport`] implements the [`SensorTransport`] trait, allowing it
//! to be used interchangeably with real transports in generic code.
//!
//! # Features
//!
//! - **Scripted readings**: each reading is delivered after its own delay
//! - **Synthetic rides**: randomized but plausible readings for a given duration
//! - **Failure injection**: make `connect` fail, or fail a number of times first
//! - **Latency simulation**: add an artificial delay to `connect`

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pedalsync_types::SessionReading;

use crate::error::{Error, Result};
use crate::streaming::{DEFAULT_STREAM_BUFFER, ReadingStream};
use crate::traits::SensorTransport;

/// One scripted reading and the delay before it is delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedReading {
    /// Delay after the previous reading (or after subscribing).
    pub delay: Duration,
    /// The reading to deliver.
    pub reading: SessionReading,
}

/// A mock sensor transport for testing.
///
/// Every call to [`subscribe`](SensorTransport::subscribe) replays the whole
/// script from the start.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use futures::StreamExt;
/// use pedalsync_core::{MockTransport, SensorTransport};
/// use pedalsync_types::SessionReading;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = MockTransport::builder()
///     .reading(Duration::from_millis(10), SessionReading::new(15.0, 0.1, 30))
///     .build();
/// transport.connect().await.unwrap();
///
/// let mut stream = transport.subscribe().await.unwrap();
/// assert_eq!(stream.next().await.unwrap().cycles, 30);
/// # }
/// ```
pub struct MockTransport {
    name: String,
    connected: AtomicBool,
    script: RwLock<Vec<ScriptedReading>>,
    hold_open: AtomicBool,
    should_fail: AtomicBool,
    remaining_failures: AtomicU32,
    connect_latency_ms: AtomicU64,
    subscriptions: RwLock<Vec<CancellationToken>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockTransport {
    /// Create a transport with an empty script.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            connected: AtomicBool::new(false),
            script: RwLock::new(Vec::new()),
            hold_open: AtomicBool::new(false),
            should_fail: AtomicBool::new(false),
            remaining_failures: AtomicU32::new(0),
            connect_latency_ms: AtomicU64::new(0),
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Create a builder.
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Replace the script.
    pub async fn set_script(&self, script: Vec<ScriptedReading>) {
        *self.script.write().await = script;
    }

    /// Number of scripted readings.
    pub async fn script_len(&self) -> usize {
        self.script.read().await.len()
    }

    /// Keep subscriptions open after the script runs out, instead of
    /// ending the stream.
    pub fn set_hold_open(&self, hold: bool) {
        self.hold_open.store(hold, Ordering::Relaxed);
    }

    /// Make `connect` fail until cleared.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Make the next `count` connects fail, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Simulated connect latency.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    fn connect_error(&self) -> Error {
        Error::connection_failed(self.name.clone(), "mock failure")
    }
}

#[async_trait]
impl SensorTransport for MockTransport {
    async fn connect(&self) -> Result<()> {
        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(self.connect_error());
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(self.connect_error());
        }

        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        for token in self.subscriptions.write().await.drain(..) {
            token.cancel();
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(&self) -> Result<ReadingStream> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(Error::NotConnected);
        }

        let script = self.script.read().await.clone();
        let hold_open = self.hold_open.load(Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(DEFAULT_STREAM_BUFFER);
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();
        self.subscriptions.write().await.push(cancel_token.clone());

        let name = self.name.clone();
        tokio::spawn(async move {
            for step in script {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(step.delay) => {}
                }
                if tx.send(step.reading).await.is_err() {
                    debug!("{}: subscriber dropped", name);
                    return;
                }
            }
            debug!("{}: script finished", name);
            if hold_open {
                task_token.cancelled().await;
            }
        });

        Ok(ReadingStream::new(rx, cancel_token))
    }
}

/// Builder for creating mock transports with custom scripts.
#[derive(Debug, Clone)]
pub struct MockTransportBuilder {
    name: String,
    script: Vec<ScriptedReading>,
    hold_open: bool,
    should_fail: bool,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransportBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            name: "Mock Trainer".to_string(),
            script: Vec::new(),
            hold_open: false,
            should_fail: false,
        }
    }

    /// Set the transport name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Append one reading delivered `delay` after the previous one.
    #[must_use]
    pub fn reading(mut self, delay: Duration, reading: SessionReading) -> Self {
        self.script.push(ScriptedReading { delay, reading });
        self
    }

    /// Append readings delivered at a fixed pace.
    #[must_use]
    pub fn readings(
        mut self,
        pace: Duration,
        readings: impl IntoIterator<Item = SessionReading>,
    ) -> Self {
        self.script.extend(
            readings
                .into_iter()
                .map(|reading| ScriptedReading { delay: pace, reading }),
        );
        self
    }

    /// Append a synthetic ride lasting `duration`, one reading per `step`.
    ///
    /// Speed wanders between 12 and 35 km/h with short stops, cadence
    /// follows speed, and distance/cycles accumulate from both.
    #[must_use]
    pub fn synthetic_ride(mut self, duration: Duration, step: Duration) -> Self {
        self.script.extend(synthetic_ride(duration, step));
        self
    }

    /// Keep the stream open after the script ends.
    #[must_use]
    pub fn hold_open(mut self, hold: bool) -> Self {
        self.hold_open = hold;
        self
    }

    /// Make `connect` fail.
    #[must_use]
    pub fn should_fail(mut self, fail: bool) -> Self {
        self.should_fail = fail;
        self
    }

    /// Build the mock transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        let transport = MockTransport::new(&self.name);
        transport.hold_open.store(self.hold_open, Ordering::Relaxed);
        transport.should_fail.store(self.should_fail, Ordering::Relaxed);
        MockTransport {
            script: RwLock::new(self.script),
            ..transport
        }
    }
}

/// Generate a plausible ride: cumulative counters that only grow.
pub fn synthetic_ride(duration: Duration, step: Duration) -> Vec<ScriptedReading> {
    let step = if step.is_zero() {
        Duration::from_secs(1)
    } else {
        step
    };
    let count = (duration.as_millis() / step.as_millis()).max(1) as usize;
    let hours_per_step = step.as_secs_f64() / 3600.0;
    let minutes_per_step = step.as_secs_f64() / 60.0;

    let mut rng = rand::rng();
    let mut speed: f64 = 20.0;
    let mut distance = 0.0;
    let mut revolutions = 0.0;
    let mut script = Vec::with_capacity(count);

    for _ in 0..count {
        let stopped = rng.random_bool(0.03);
        speed = if stopped {
            0.0
        } else {
            (speed.max(12.0) + rng.random_range(-2.0..2.0)).clamp(12.0, 35.0)
        };
        let rpm = if stopped { 0.0 } else { speed * 3.6 };
        distance += speed * hours_per_step;
        revolutions += rpm * minutes_per_step;

        script.push(ScriptedReading {
            delay: step,
            reading: SessionReading::new(speed, distance, revolutions as u64).with_rpm(rpm),
        });
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let transport = MockTransport::new("Trainer");
        assert!(matches!(
            transport.subscribe().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_is_replayed_in_order() {
        let transport = MockTransport::builder()
            .readings(
                Duration::from_secs(1),
                (1..=4).map(|c| SessionReading::new(10.0, c as f64 * 0.01, c)),
            )
            .build();
        transport.connect().await.unwrap();

        let cycles: Vec<u64> = transport
            .subscribe()
            .await
            .unwrap()
            .map(|r| r.cycles)
            .collect()
            .await;
        assert_eq!(cycles, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_ends_held_stream() {
        let transport = MockTransport::builder()
            .reading(Duration::from_secs(1), SessionReading::new(10.0, 0.1, 5))
            .hold_open(true)
            .build();
        transport.connect().await.unwrap();
        let mut stream = transport.subscribe().await.unwrap();

        assert!(stream.next().await.is_some());
        transport.disconnect().await.unwrap();
        assert!(stream.next().await.is_none());
        assert!(!transport.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_failures() {
        let transport = MockTransport::builder().should_fail(true).build();
        assert!(matches!(
            transport.connect().await,
            Err(Error::ConnectionFailed { .. })
        ));

        transport.set_should_fail(false);
        transport.set_transient_failures(2);
        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_ok());
    }

    #[test]
    fn test_synthetic_ride_counters_grow() {
        let script = synthetic_ride(Duration::from_secs(120), Duration::from_secs(1));
        assert_eq!(script.len(), 120);

        let mut prev = SessionReading::default();
        for step in &script {
            assert!(step.reading.validate().is_ok());
            assert!(step.reading.distance >= prev.distance);
            assert!(step.reading.cycles >= prev.cycles);
            prev = step.reading;
        }
        assert!(prev.distance > 0.0);
    }
}
