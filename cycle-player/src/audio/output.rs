//! Audio output handle interface
//!
//! Models a media-element style output: one source loaded at a time,
//! play/pause/rewind commands, a position readout, and an event stream for
//! end-of-media and device errors.
//!
//! The handle is created once and reused for every segment. Platforms with
//! touch-gesture audio unlocking require this, so implementations must not
//! assume they will be recreated between cycles.

use crate::error::Result;
use std::time::Duration;
use tokio::sync::broadcast;

/// Event raised by the output device
///
/// `src` is the URI that was loaded when the event fired, so listeners can
/// ignore events belonging to a source they did not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Playback reached end-of-media
    Ended { src: String },
    /// Device error with its raw media error code
    Error { src: String, code: u16 },
}

/// Reusable audio output handle
pub trait AudioOutput: Send + Sync {
    /// Replace the current source; stops whatever was playing
    fn load(&self, uri: &str) -> Result<()>;

    /// Start or resume playback of the loaded source
    fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position
    fn pause(&self);

    /// Move the playback position back to zero
    fn rewind(&self);

    /// Current playback position
    fn position(&self) -> Duration;

    /// True while the device claims to be actively playing
    fn is_playing(&self) -> bool;

    /// Register a listener for device events
    ///
    /// Dropping the receiver detaches the listener.
    fn subscribe(&self) -> broadcast::Receiver<OutputEvent>;
}
