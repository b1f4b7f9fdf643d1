//! Error types for cycle-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Stall and safety-timeout settlements are not errors; they complete a segment.

use cycle_common::events::MediaErrorKind;
use cycle_common::CycleSide;
use thiserror::Error;

/// Main error type for cycle-player
#[derive(Error, Debug)]
pub enum Error {
    /// Resolver returned nothing for a required audio reference
    #[error("Audio source not found for {side} side of cycle {cycle_id} (audio id {audio_id})")]
    SourceNotFound {
        cycle_id: String,
        side: CycleSide,
        audio_id: String,
    },

    /// Output device reported an error while playing a segment
    #[error("Audio device error on {side} side: {kind}")]
    Media { side: CycleSide, kind: MediaErrorKind },

    /// Cycle cancelled by stop() or superseded by a newer cycle
    #[error("Playback aborted")]
    Aborted,

    /// Caller supplied a malformed cycle
    #[error("Invalid cycle: {0}")]
    InvalidCycle(String),

    /// Output device refused a command
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] cycle_common::Error),
}

impl Error {
    /// True for cancellation, which callers treat as a non-failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

/// Convenience Result type using cycle-player Error
pub type Result<T> = std::result::Result<T, Error>;
