//! Event types for the cycle engine event system
//!
//! Provides shared event definitions and the EventBus used by the player,
//! the degradation controller and any UI layer listening to them.

// Sub-modules (supporting types)
mod degradation_types;
mod playback_types;

pub use degradation_types::DegradationLevel;
pub use playback_types::{CyclePhase, MediaErrorKind, SegmentOutcome, WatchdogKind};

use crate::cycle::CycleSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Player event types
///
/// Events are broadcast via EventBus and can be serialized for display or logging.
/// `attempt_id` identifies one `play_cycle` invocation, so events of a superseded
/// attempt can be told apart from the one that replaced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Cycle phase changed
    PhaseChanged {
        cycle_id: String,
        attempt_id: Uuid,
        old_phase: CyclePhase,
        new_phase: CyclePhase,
        timestamp: DateTime<Utc>,
    },

    /// One audio segment settled successfully
    SegmentSettled {
        cycle_id: String,
        attempt_id: Uuid,
        side: CycleSide,
        outcome: SegmentOutcome,
        timestamp: DateTime<Utc>,
    },

    /// All four phases finished
    CycleCompleted {
        cycle_id: String,
        attempt_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Cycle attempt failed (source not found or device error)
    CycleFailed {
        cycle_id: String,
        attempt_id: Uuid,
        /// Human-readable error, logged rather than shown to the learner
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Cycle attempt cancelled by `stop()` or superseded by a newer cycle
    CycleAborted {
        cycle_id: String,
        attempt_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A watchdog forced a segment forward
    WatchdogIntervention {
        cycle_id: String,
        side: CycleSide,
        kind: WatchdogKind,
        /// Running total since the player was created
        interventions_total: u64,
        timestamp: DateTime<Utc>,
    },

    /// Degradation level changed
    DegradationChanged {
        old_level: DegradationLevel,
        new_level: DegradationLevel,
        /// Learner-facing message for the new level (None when normal)
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Platform connectivity signal changed
    ConnectivityChanged {
        online: bool,
        timestamp: DateTime<Utc>,
    },

    /// Session queue cursor moved
    QueueProgress {
        cursor: usize,
        total: usize,
        progress_percent: u8,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Event type name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PhaseChanged { .. } => "PhaseChanged",
            PlayerEvent::SegmentSettled { .. } => "SegmentSettled",
            PlayerEvent::CycleCompleted { .. } => "CycleCompleted",
            PlayerEvent::CycleFailed { .. } => "CycleFailed",
            PlayerEvent::CycleAborted { .. } => "CycleAborted",
            PlayerEvent::WatchdogIntervention { .. } => "WatchdogIntervention",
            PlayerEvent::DegradationChanged { .. } => "DegradationChanged",
            PlayerEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
            PlayerEvent::QueueProgress { .. } => "QueueProgress",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use cycle_common::events::{EventBus, PlayerEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlayerEvent::ConnectivityChanged {
///     online: false,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(
///     rx.try_recv(),
///     Ok(PlayerEvent::ConnectivityChanged { online: false, .. })
/// ));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
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

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
