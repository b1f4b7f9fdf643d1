//! Playback-related type definitions
//!
//! Supporting types for cycle phases and segment settlement.

use serde::{Deserialize, Serialize};

/// Cycle phase enumeration
///
/// Transitions are strictly linear: Idle -> Prompt -> Pause -> Voice1 -> Voice2 -> Idle.
/// Abort returns to Idle from any phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    /// No cycle in flight (initial and terminal-success state)
    #[default]
    Idle,
    /// Known-language prompt is playing
    Prompt,
    /// Silent gap after the prompt
    Pause,
    /// First target rendition is playing
    #[serde(rename = "VOICE_1")]
    Voice1,
    /// Second target rendition is playing
    #[serde(rename = "VOICE_2")]
    Voice2,
}

impl CyclePhase {
    /// Next phase in a successful run
    pub fn next(self) -> CyclePhase {
        match self {
            CyclePhase::Idle => CyclePhase::Prompt,
            CyclePhase::Prompt => CyclePhase::Pause,
            CyclePhase::Pause => CyclePhase::Voice1,
            CyclePhase::Voice1 => CyclePhase::Voice2,
            CyclePhase::Voice2 => CyclePhase::Idle,
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "IDLE"),
            CyclePhase::Prompt => write!(f, "PROMPT"),
            CyclePhase::Pause => write!(f, "PAUSE"),
            CyclePhase::Voice1 => write!(f, "VOICE_1"),
            CyclePhase::Voice2 => write!(f, "VOICE_2"),
        }
    }
}

/// How an audio segment settled successfully
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Output device signalled end-of-media
    Completed,
    /// Position stopped advancing while playing; skipped forward
    Stalled,
    /// Absolute safety ceiling reached; skipped forward
    TimedOut,
}

impl SegmentOutcome {
    /// True when a watchdog forced the settlement
    pub fn is_watchdog(self) -> bool {
        !matches!(self, SegmentOutcome::Completed)
    }
}

impl std::fmt::Display for SegmentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentOutcome::Completed => write!(f, "completed"),
            SegmentOutcome::Stalled => write!(f, "stalled"),
            SegmentOutcome::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Classification of an output device error code
///
/// Codes follow the media element convention:
/// 1 = aborted, 2 = network, 3 = decode, 4 = source not supported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    UnsupportedFormat,
    /// Any code outside 1..=4
    Unknown,
}

impl MediaErrorKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaErrorKind::Aborted,
            2 => MediaErrorKind::Network,
            3 => MediaErrorKind::Decode,
            4 => MediaErrorKind::UnsupportedFormat,
            _ => MediaErrorKind::Unknown,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            MediaErrorKind::Aborted => 1,
            MediaErrorKind::Network => 2,
            MediaErrorKind::Decode => 3,
            MediaErrorKind::UnsupportedFormat => 4,
            MediaErrorKind::Unknown => 0,
        }
    }
}

impl std::fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaErrorKind::Aborted => write!(f, "playback aborted"),
            MediaErrorKind::Network => write!(f, "network error"),
            MediaErrorKind::Decode => write!(f, "decode error"),
            MediaErrorKind::UnsupportedFormat => write!(f, "audio format not supported"),
            MediaErrorKind::Unknown => write!(f, "unknown media error"),
        }
    }
}

/// Which watchdog forced a segment forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogKind {
    Stall,
    SafetyTimeout,
}

impl std::fmt::Display for WatchdogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchdogKind::Stall => write!(f, "stall"),
            WatchdogKind::SafetyTimeout => write!(f, "safety_timeout"),
        }
    }
}
