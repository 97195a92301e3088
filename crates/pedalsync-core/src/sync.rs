//! Periodic push of session progress to the backend.
//!
//! [`SyncTimer`] is a cancellable scheduled task tied to one session: it is
//! started with the session and cancelled when the session stops (or when
//! the timer is dropped). Each tick asks [`SyncEmitter`] for a snapshot; a
//! session with no distance, cycles or calories yet produces none.
//!
//! Pushes are fire-and-forget. A failure is logged and the next tick simply
//! sends fresher data.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pedalsync_types::SessionSnapshot;

use crate::aggregator::ActiveSessionTotals;
use crate::events::{EventDispatcher, SessionEvent};
use crate::traits::SessionStore;

/// Repeating tick source for one session.
///
/// The first tick fires one full period after [`start`](Self::start). Ticks
/// that are not consumed in time are coalesced, never bursted.
pub struct SyncTimer {
    ticks: mpsc::Receiver<()>,
    handle: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
    period: Duration,
}

impl std::fmt::Debug for SyncTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTimer")
            .field("period", &self.period)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl SyncTimer {
    /// Spawn the timer task. Must be called within a tokio runtime.
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Sync timer cancelled");
                        break;
                    }
                    _ = timer.tick() => {
                        match tx.try_send(()) {
                            Ok(()) | Err(TrySendError::Full(())) => {}
                            Err(TrySendError::Closed(())) => break,
                        }
                    }
                }
            }
        });

        Self {
            ticks: rx,
            handle,
            cancel_token,
            period,
        }
    }

    /// Wait for the next tick. Returns `None` once the timer is cancelled.
    pub async fn tick(&mut self) -> Option<()> {
        self.ticks.recv().await
    }

    /// Stop the timer.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the timer has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if the background task is still running.
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// The tick period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for SyncTimer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Builds snapshots and pushes them to a [`SessionStore`].
#[derive(Clone)]
pub struct SyncEmitter {
    store: Arc<dyn SessionStore>,
    events: EventDispatcher,
}

impl std::fmt::Debug for SyncEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEmitter").finish_non_exhaustive()
    }
}

impl SyncEmitter {
    /// Create an emitter pushing to `store` and reporting on `events`.
    pub fn new(store: Arc<dyn SessionStore>, events: EventDispatcher) -> Self {
        Self { store, events }
    }

    /// Snapshot of the active totals at `now`.
    ///
    /// Returns `None` while distance, cycles and calories are all zero, so a
    /// just-started or just-reset session is never synced.
    pub fn snapshot(totals: &ActiveSessionTotals, now: Instant) -> Option<SessionSnapshot> {
        if totals.is_blank() {
            return None;
        }
        Some(SessionSnapshot {
            session_id: totals.session_id,
            duration_secs: totals.elapsed(now).as_secs(),
            distance: totals.current_distance,
            cycles: totals.current_cycles,
            calories: totals.current_calories,
            avg_speed: totals.speed_window.mean(),
            max_speed: totals.speed_window.max(),
            taken_at: totals.wall_at(now),
        })
    }

    /// Push a snapshot, logging and reporting the outcome.
    ///
    /// Returns whether the push succeeded; callers are free to ignore it.
    pub async fn push(&self, snapshot: SessionSnapshot) -> bool {
        let session_id = snapshot.session_id;
        match self.store.update_session(&snapshot).await {
            Ok(()) => {
                debug!(
                    "Synced session {}: {:.3} km, {} cycles, {} kcal",
                    session_id, snapshot.distance, snapshot.cycles, snapshot.calories
                );
                self.events.send(SessionEvent::Synced { snapshot });
                true
            }
            Err(e) => {
                warn!("Failed to sync session {}: {}", session_id, e);
                self.events.send(SessionEvent::SyncFailed {
                    session_id,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Push a snapshot from a background task without waiting for it.
    pub fn spawn_push(&self, snapshot: SessionSnapshot) -> tokio::task::JoinHandle<bool> {
        let emitter = self.clone();
        tokio::spawn(async move { emitter.push(snapshot).await })
    }
}
