//! Event types for the cuebox event system
//!
//! Provides shared event definitions and the EventBus used by the engine to
//! publish status, current-cue and crossfade progress notifications.

mod status_types;

pub use status_types::{PlaybackStatus, StatusDetails};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::CueId;

/// Cuebox event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to remote control surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CueEvent {
    /// Cue session status changed
    ///
    /// Triggers:
    /// - Remote surfaces: update tile state
    /// - Operator log: record stops and errors with their reason
    CueStatus {
        /// Cue the status belongs to
        cue_id: CueId,
        /// New status
        status: PlaybackStatus,
        /// Reason/message payload
        details: StatusDetails,
        /// When the status was reported
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Most recent audible-or-paused cue changed
    ///
    /// Triggers:
    /// - Control surface: retarget transport buttons
    CurrentCueChanged {
        /// New priority cue (None when nothing is active)
        cue_id: Option<CueId>,
        /// When the change was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress of an outgoing cue during a crossfade
    ///
    /// Emitted periodically until the outgoing cue's ramp completes.
    CrossfadeProgress {
        /// Cue being faded out
        cue_id: CueId,
        /// Cue being faded in
        incoming_cue_id: CueId,
        /// Ramp progress (0.0-1.0)
        progress: f32,
        /// Time left on the ramp (milliseconds)
        remaining_ms: u64,
        /// Progress update timestamp
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CueEvent {
    /// Cue the event refers to, if any
    pub fn cue_id(&self) -> Option<&CueId> {
        match self {
            CueEvent::CueStatus { cue_id, .. } => Some(cue_id),
            CueEvent::CurrentCueChanged { cue_id, .. } => cue_id.as_ref(),
            CueEvent::CrossfadeProgress { cue_id, .. } => Some(cue_id),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use cuebox_common::events::{CueEvent, EventBus, PlaybackStatus, StatusDetails};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(256));
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CueEvent::CueStatus {
///     cue_id: "intro".into(),
///     status: PlaybackStatus::Stopped,
///     details: StatusDetails::reason("user_stop"),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CueEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CueEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: CueEvent) -> Result<usize, broadcast::error::SendError<CueEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Status reporting is fire-and-forget: never awaited, never retried.
    pub fn emit_lossy(&self, event: CueEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(CueEvent::CurrentCueChanged {
            cue_id: None,
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_status() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(CueEvent::CueStatus {
            cue_id: CueId::from("walk-in"),
            status: PlaybackStatus::CuedNext,
            details: StatusDetails::default().with_message("Next: Track B"),
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            CueEvent::CueStatus { cue_id, status, details, .. } => {
                assert_eq!(cue_id.as_str(), "walk-in");
                assert_eq!(status, PlaybackStatus::CuedNext);
                assert_eq!(details.message.as_deref(), Some("Next: Track B"));
            }
            other => panic!("Expected CueStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_status_event_serializes_with_type_tag() {
        let event = CueEvent::CueStatus {
            cue_id: CueId::from("a"),
            status: PlaybackStatus::Stopped,
            details: StatusDetails::reason("playlist_ended_fully_no_loop_stop_mode"),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CueStatus");
        assert_eq!(json["status"], "stopped");
        assert_eq!(json["details"]["reason"], "playlist_ended_fully_no_loop_stop_mode");
        assert!(json["details"].get("message").is_none());
    }
}
