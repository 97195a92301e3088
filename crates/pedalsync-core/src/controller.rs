//! Session controller: one task that owns the aggregator.
//!
//! The controller serializes everything that touches a live session. It
//! waits on three inputs and fully handles one before admitting the next:
//!
//! ```text
//!  SessionHandle ──Command──▶ ┌──────────────────────┐ ──update──▶ SessionStore
//!  ReadingStream ──reading──▶ │  SessionController   │ ──events──▶ EventDispatcher
//!  SyncTimer ─────tick──────▶ └──────────────────────┘
//! ```
//!
//! Readings are applied in arrival order. Sync pushes run in spawned tasks so
//! a slow backend never delays reading ingestion; stopping a session cancels
//! its timer but never aborts a push already in flight.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use pedalsync_types::{NewSession, SessionId, SessionReading, SessionRecord};

use crate::aggregator::{ActiveSessionTotals, SessionAggregator, UpdateOutcome};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, ResetCause, SessionEvent};
use crate::streaming::ReadingStream;
use crate::sync::{SyncEmitter, SyncTimer};
use crate::traits::{ProfileSource, SessionStore};

/// Requests sent from a [`SessionHandle`] to the controller task.
#[derive(Debug)]
enum Command {
    Start {
        user_id: String,
        weight_kg: Option<f64>,
        reply: oneshot::Sender<SessionId>,
    },
    Stop {
        reply: oneshot::Sender<Option<SessionRecord>>,
    },
    Reset {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<ActiveSessionTotals>>,
    },
    AttachStream {
        stream: ReadingStream,
    },
    Shutdown {
        reply: oneshot::Sender<Option<SessionRecord>>,
    },
}

/// The task that owns a [`SessionAggregator`].
///
/// Create one with [`SessionController::spawn`] and drive it through the
/// returned [`SessionHandle`].
pub struct SessionController {
    config: SessionConfig,
    aggregator: SessionAggregator,
    store: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileSource>,
    emitter: SyncEmitter,
    events: EventDispatcher,
    commands: mpsc::Receiver<Command>,
    readings: Option<ReadingStream>,
    timer: Option<SyncTimer>,
    pending_create: Option<NewSession>,
}

impl SessionController {
    /// Validate `config` and spawn the controller task.
    ///
    /// The task runs until [`SessionHandle::shutdown`] is called or every
    /// handle is dropped; either way an active session is finalized first.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use pedalsync_core::{MemoryStore, ReadingStream, SessionConfig, SessionController};
    /// use pedalsync_types::SessionReading;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> pedalsync_core::Result<()> {
    /// let store = Arc::new(MemoryStore::new());
    /// let (tx, stream) = ReadingStream::channel(8);
    /// let handle = SessionController::spawn(
    ///     SessionConfig::default(),
    ///     stream,
    ///     store.clone(),
    ///     store.clone(),
    /// )?;
    ///
    /// handle.start_session("rider", Some(72.0)).await?;
    /// tx.send(SessionReading::new(18.0, 0.05, 12)).await.unwrap();
    /// let record = handle.stop_session().await?.unwrap();
    /// assert_eq!(record.user_id, "rider");
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(
        config: SessionConfig,
        readings: ReadingStream,
        store: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Result<SessionHandle> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.command_buffer);
        let events = EventDispatcher::new(config.event_capacity);
        let controller = Self {
            aggregator: SessionAggregator::new(&config),
            emitter: SyncEmitter::new(Arc::clone(&store), events.clone()),
            events: events.clone(),
            config,
            store,
            profiles,
            commands: rx,
            readings: Some(readings),
            timer: None,
            pending_create: None,
        };
        tokio::spawn(controller.run());

        Ok(SessionHandle {
            commands: tx,
            events,
        })
    }

    async fn run(mut self) {
        debug!("Session controller started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let record = self.stop().await;
                        let _ = reply.send(record);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All session handles dropped");
                        self.stop().await;
                        break;
                    }
                },
                reading = next_reading(&mut self.readings) => match reading {
                    Some(reading) => self.handle_reading(&reading),
                    None => self.handle_stream_end().await,
                },
                Some(()) = next_tick(&mut self.timer) => self.handle_tick().await,
            }
        }
        debug!("Session controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                user_id,
                weight_kg,
                reply,
            } => {
                let session_id = self.start(user_id, weight_kg).await;
                let _ = reply.send(session_id);
            }
            Command::Stop { reply } => {
                let record = self.stop().await;
                let _ = reply.send(record);
            }
            Command::Reset { reply } => {
                let _ = reply.send(self.reset());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.aggregator.totals().cloned());
            }
            Command::AttachStream { stream } => {
                info!("Reading stream attached");
                self.readings = Some(stream);
            }
            // Handled in the run loop.
            Command::Shutdown { .. } => {}
        }
    }

    async fn start(&mut self, user_id: String, weight_kg: Option<f64>) -> SessionId {
        self.stop().await;

        let weight_kg = match weight_kg {
            Some(weight) => Some(weight),
            None => self.lookup_weight(&user_id).await,
        };

        let session_id = SessionId::new();
        self.aggregator
            .start_at(session_id, user_id, weight_kg, Instant::now());

        if let Some(totals) = self.aggregator.totals() {
            let new_session = NewSession {
                session_id,
                user_id: totals.user_id.clone(),
                started_at: totals.started_at,
                user_weight_kg: totals.user_weight_kg,
            };
            self.events.send(SessionEvent::Started {
                session_id,
                user_id: new_session.user_id.clone(),
                user_weight_kg: new_session.user_weight_kg,
            });
            self.create_remote(new_session).await;
        }

        self.timer = Some(SyncTimer::start(self.config.sync_interval));
        session_id
    }

    async fn lookup_weight(&self, user_id: &str) -> Option<f64> {
        match self.profiles.user_weight_kg(user_id).await {
            Ok(Some(weight)) => Some(weight),
            Ok(None) => {
                debug!("No stored weight for {}, using default", user_id);
                None
            }
            Err(e) => {
                warn!("Weight lookup for {} failed, using default: {}", user_id, e);
                None
            }
        }
    }

    /// Create the backend record, remembering it for a retry on failure.
    async fn create_remote(&mut self, session: NewSession) -> bool {
        match self.store.create_session(&session).await {
            Ok(()) => {
                debug!("Created backend record for session {}", session.session_id);
                self.pending_create = None;
                true
            }
            Err(e) => {
                warn!(
                    "Failed to create backend record for session {}: {}",
                    session.session_id, e
                );
                self.events.send(SessionEvent::SyncFailed {
                    session_id: session.session_id,
                    error: e.to_string(),
                });
                self.pending_create = Some(session);
                false
            }
        }
    }

    async fn stop(&mut self) -> Option<SessionRecord> {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        let record = self.aggregator.stop_at(Instant::now())?;

        if let Some(pending) = self.pending_create.take() {
            self.create_remote(pending).await;
            self.pending_create = None;
        }

        if let Err(e) = self.store.finalize_session(&record).await {
            warn!("Failed to persist session {}: {}", record.session_id, e);
            self.events.send(SessionEvent::PersistFailed {
                session_id: record.session_id,
                error: e.to_string(),
            });
        }

        self.events.send(SessionEvent::Stopped {
            record: record.clone(),
        });
        Some(record)
    }

    fn reset(&mut self) -> bool {
        if !self.aggregator.reset_at(Instant::now()) {
            return false;
        }
        if let Some(totals) = self.aggregator.totals() {
            self.events.send(SessionEvent::Reset {
                session_id: totals.session_id,
                cause: ResetCause::Manual,
            });
        }
        true
    }

    fn handle_reading(&mut self, reading: &SessionReading) {
        let outcome = self.aggregator.update_at(reading, Instant::now());
        let Some(totals) = self.aggregator.totals() else {
            debug!("Reading received with no active session");
            return;
        };
        let session_id = totals.session_id;

        let event = match outcome {
            UpdateOutcome::Ignored => return,
            UpdateOutcome::Rejected(e) => SessionEvent::ReadingRejected {
                session_id,
                error: e.to_string(),
            },
            UpdateOutcome::HardwareReset => SessionEvent::Reset {
                session_id,
                cause: ResetCause::Hardware,
            },
            UpdateOutcome::Applied => SessionEvent::Updated {
                session_id,
                speed: totals.current_speed,
                distance: totals.current_distance,
                cycles: totals.current_cycles,
                calories: totals.current_calories,
            },
        };
        self.events.send(event);
    }

    async fn handle_stream_end(&mut self) {
        self.readings = None;
        let session_id = self.aggregator.totals().map(|t| t.session_id);
        warn!("Reading stream ended");
        self.events
            .send(SessionEvent::SensorDisconnected { session_id });

        if self.config.stop_on_disconnect {
            self.stop().await;
        }
    }

    async fn handle_tick(&mut self) {
        if let Some(pending) = self.pending_create.take() {
            if !self.create_remote(pending).await {
                return;
            }
        }

        let Some(totals) = self.aggregator.totals() else {
            return;
        };
        match SyncEmitter::snapshot(totals, Instant::now()) {
            Some(snapshot) => {
                self.emitter.spawn_push(snapshot);
            }
            None => {
                debug!("Session {} has no progress yet, skipping sync", totals.session_id);
                self.events.send(SessionEvent::SyncSkipped {
                    session_id: totals.session_id,
                });
            }
        }
    }
}

async fn next_reading(readings: &mut Option<ReadingStream>) -> Option<SessionReading> {
    match readings {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: &mut Option<SyncTimer>) -> Option<()> {
    match timer {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`SessionController`].
///
/// Every method fails with [`Error::ControllerClosed`] once the controller
/// has shut down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: EventDispatcher,
}

impl SessionHandle {
    async fn request<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Result<T> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ControllerClosed)?;
        reply.await.map_err(|_| Error::ControllerClosed)
    }

    /// Start a session for `user_id`.
    ///
    /// An active session is finalized and persisted first. Without
    /// `weight_kg` the rider's stored weight is used, or the configured
    /// default when there is none.
    pub async fn start_session(
        &self,
        user_id: impl Into<String>,
        weight_kg: Option<f64>,
    ) -> Result<SessionId> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Start {
            user_id: user_id.into(),
            weight_kg,
            reply,
        };
        self.request(command, rx).await
    }

    /// Stop the active session and return its final record.
    ///
    /// Returns `Ok(None)` when no session is active.
    pub async fn stop_session(&self) -> Result<Option<SessionRecord>> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Stop { reply }, rx).await
    }

    /// Zero the counters of the active session without ending it.
    ///
    /// Returns `Ok(false)` when no session is active.
    pub async fn reset_session_data(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Reset { reply }, rx).await
    }

    /// Copy of the live totals.
    pub async fn snapshot(&self) -> Result<Option<ActiveSessionTotals>> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Snapshot { reply }, rx).await
    }

    /// Replace the reading stream, e.g. after the transport reconnected.
    pub async fn attach_stream(&self, stream: ReadingStream) -> Result<()> {
        self.commands
            .send(Command::AttachStream { stream })
            .await
            .map_err(|_| Error::ControllerClosed)
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Stop any active session and end the controller task.
    pub async fn shutdown(&self) -> Result<Option<SessionRecord>> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Shutdown { reply }, rx).await
    }

    /// Whether the controller task has ended.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
