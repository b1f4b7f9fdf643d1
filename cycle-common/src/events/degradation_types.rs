//! Offline degradation type definitions

use serde::{Deserialize, Serialize};

/// How far the engine has fallen back from the intended content
///
/// Ordered from full fidelity to last resort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DegradationLevel {
    /// Scheduled content plays as-is
    #[default]
    Normal,
    /// Random pick from the cached pool
    BeltOnly,
    /// Random pick from already-mastered cached content
    UsePhrases,
    /// Replay of the last successfully played cycle
    Repeat,
}

impl DegradationLevel {
    /// Learner-facing message, None for `Normal`
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            DegradationLevel::Normal => None,
            DegradationLevel::BeltOnly => Some("Playing from your offline library"),
            DegradationLevel::UsePhrases => Some("Practising phrases you already know"),
            DegradationLevel::Repeat => Some("Repeating last lesson - go online to continue"),
        }
    }
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationLevel::Normal => write!(f, "normal"),
            DegradationLevel::BeltOnly => write!(f, "belt-only"),
            DegradationLevel::UsePhrases => write!(f, "use-phrases"),
            DegradationLevel::Repeat => write!(f, "repeat"),
        }
    }
}
