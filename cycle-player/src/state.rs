//! Shared player state
//!
//! State shared between the player, the degradation controller, the session
//! and any UI layer observing them.

use crate::playback::state::PlaybackState;
use cycle_common::events::{EventBus, PlayerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};

/// Shared state accessible by all components
///
/// The playback snapshot lives in a `watch` channel so UI bindings always see
/// the latest complete value; discrete happenings go through the event bus.
pub struct SharedState {
    /// Latest playback snapshot (phase / is_playing / error)
    playback: watch::Sender<PlaybackState>,

    /// Event broadcaster
    events: EventBus,

    /// Times a watchdog forced a segment forward (stall or safety timeout)
    watchdog_interventions_total: AtomicU64,
}

impl SharedState {
    /// Create new shared state with the given event capacity
    pub fn new(event_capacity: usize) -> Self {
        let (playback, _) = watch::channel(PlaybackState::default());
        Self {
            playback,
            events: EventBus::new(event_capacity),
            watchdog_interventions_total: AtomicU64::new(0),
        }
    }

    /// Broadcast an event, ignoring if nobody listens
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Event bus handle for components that emit on their own
    pub fn event_bus(&self) -> EventBus {
        self.events.clone()
    }

    /// Current playback snapshot
    pub fn playback_state(&self) -> PlaybackState {
        self.playback.borrow().clone()
    }

    /// Subscribe to playback snapshots
    pub fn watch_playback(&self) -> watch::Receiver<PlaybackState> {
        self.playback.subscribe()
    }

    /// Replace the playback snapshot; returns the previous value
    pub(crate) fn replace_playback(&self, state: PlaybackState) -> PlaybackState {
        self.playback.send_replace(state)
    }

    /// Increment the watchdog intervention counter, returning the new total
    pub fn increment_watchdog_interventions(&self) -> u64 {
        self.watchdog_interventions_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total watchdog interventions since creation
    pub fn watchdog_interventions(&self) -> u64 {
        self.watchdog_interventions_total.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(100)
    }
}
