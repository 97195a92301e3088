//! Session event system.
//!
//! Observers (dashboards, timers in the UI layer, loggers) subscribe to a
//! broadcast channel and receive every lifecycle change of the controller.
//! A slow receiver drops old events rather than blocking the session.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use pedalsync_types::{SessionId, SessionRecord, SessionSnapshot};

/// What caused the counters of a session to be zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    /// The sensor's own counters reverted to zero.
    Hardware,
    /// A caller asked for the reset.
    Manual,
}

/// Events emitted by a session controller.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// A session started.
    Started {
        session_id: SessionId,
        user_id: String,
        user_weight_kg: f64,
    },
    /// A reading was applied to the active session.
    Updated {
        session_id: SessionId,
        speed: f64,
        distance: f64,
        cycles: u64,
        calories: u32,
    },
    /// Session counters were zeroed. Dependent timers should restart.
    Reset {
        session_id: SessionId,
        cause: ResetCause,
    },
    /// A reading failed validation and was dropped.
    ReadingRejected { session_id: SessionId, error: String },
    /// Partial progress reached the backend.
    Synced { snapshot: SessionSnapshot },
    /// A sync tick found nothing worth pushing.
    SyncSkipped { session_id: SessionId },
    /// A backend push failed; the next tick retries with fresher data.
    SyncFailed { session_id: SessionId, error: String },
    /// A session stopped.
    Stopped { record: SessionRecord },
    /// The final record could not be handed to the backend.
    PersistFailed { session_id: SessionId, error: String },
    /// The reading stream ended.
    SensorDisconnected { session_id: Option<SessionId> },
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = SessionEvent::Reset {
            session_id: SessionId::new(),
            cause: ResetCause::Hardware,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reset");
        assert_eq!(json["cause"], "hardware");
    }

    #[tokio::test]
    async fn test_dispatcher_fan_out() {
        let dispatcher = EventDispatcher::new(8);
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(SessionEvent::SensorDisconnected { session_id: None });

        assert!(matches!(
            a.recv().await.unwrap(),
            SessionEvent::SensorDisconnected { session_id: None }
        ));
        assert!(matches!(
            b.recv().await.unwrap(),
            SessionEvent::SensorDisconnected { .. }
        ));
    }

    #[test]
    fn test_send_without_receivers() {
        let dispatcher = EventDispatcher::default();
        dispatcher.send(SessionEvent::SensorDisconnected { session_id: None });
        assert_eq!(dispatcher.receiver_count(), 0);
    }
}
