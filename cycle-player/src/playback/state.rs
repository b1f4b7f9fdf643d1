//! Playback state snapshot

use cycle_common::events::CyclePhase;
use serde::{Deserialize, Serialize};

/// Playback state of the cycle player
///
/// Single-writer: only the player replaces it, always as a whole value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub phase: CyclePhase,
    pub is_playing: bool,
    /// Last fatal error of the current or most recent cycle
    pub error: Option<String>,
}

impl PlaybackState {
    /// Idle and not playing, with an optional error message
    pub fn idle(error: Option<String>) -> Self {
        Self {
            phase: CyclePhase::Idle,
            is_playing: false,
            error,
        }
    }

    /// Playing in the given phase, error cleared
    pub fn playing(phase: CyclePhase) -> Self {
        Self {
            phase,
            is_playing: true,
            error: None,
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.error, self.is_playing) {
            (Some(e), _) => write!(f, "{} (error: {})", self.phase, e),
            (None, true) => write!(f, "{} (playing)", self.phase),
            (None, false) => write!(f, "{}", self.phase),
        }
    }
}
