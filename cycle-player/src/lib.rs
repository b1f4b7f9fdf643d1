//! # Cycle Player Library (cycle-player)
//!
//! Resilient cycle-playback engine.
//!
//! **Purpose:** Drive a learner through timed four-phase audio cycles
//! (prompt, pause, two target renditions), recover from stalled or broken
//! media without surfacing errors, and fall back to offline content when the
//! network or the scheduled content is unavailable.
//!
//! **Architecture:**
//! - [`audio::AudioResourceManager`] owns the single reusable output handle
//!   and the single temporary object URL slot
//! - [`playback::CyclePlayer`] runs the phase state machine with per-segment watchdogs
//! - [`playback::SessionQueue`] holds the ordered cycles and the cursor
//! - [`degradation::DegradationController`] picks the next playable cycle
//! - [`playback::Session`] wires the four together

pub mod audio;
pub mod content;
pub mod degradation;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
