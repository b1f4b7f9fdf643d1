//! Cycle data model
//!
//! A Cycle is the atomic playback unit: a known-language prompt, a silent
//! pause, then two renditions of the target-language phrase. Cycles are
//! created upstream by content loaders and only read by the engine.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Known-language side, played as the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSide {
    /// Audio reference resolved through the audio resolver
    pub audio_id: String,
    /// Display text
    #[serde(default)]
    pub text: String,
}

/// Target-language side with two independently addressable renditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSide {
    pub voice1_audio_id: String,
    pub voice2_audio_id: String,
    /// Display text
    #[serde(default)]
    pub text: String,
}

/// One four-phase playback unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Unique identifier
    pub id: String,
    pub known: KnownSide,
    pub target: TargetSide,
    /// Silent gap after the prompt, in milliseconds (unbounded above)
    #[serde(default)]
    pub pause_duration_ms: u64,
}

impl Cycle {
    /// Build a cycle from its audio ids with empty display text
    pub fn new(
        id: impl Into<String>,
        known_audio_id: impl Into<String>,
        voice1_audio_id: impl Into<String>,
        voice2_audio_id: impl Into<String>,
        pause_duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            known: KnownSide {
                audio_id: known_audio_id.into(),
                text: String::new(),
            },
            target: TargetSide {
                voice1_audio_id: voice1_audio_id.into(),
                voice2_audio_id: voice2_audio_id.into(),
                text: String::new(),
            },
            pause_duration_ms,
        }
    }

    /// Audio reference for one side of the cycle
    pub fn audio_id(&self, side: CycleSide) -> &str {
        match side {
            CycleSide::Known => &self.known.audio_id,
            CycleSide::Voice1 => &self.target.voice1_audio_id,
            CycleSide::Voice2 => &self.target.voice2_audio_id,
        }
    }

    /// All three audio references in playback order
    pub fn audio_ids(&self) -> [&str; 3] {
        [
            &self.known.audio_id,
            &self.target.voice1_audio_id,
            &self.target.voice2_audio_id,
        ]
    }

    /// Reject cycles with an empty identifier or audio reference
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("cycle id is empty".to_string()));
        }
        for side in CycleSide::ALL {
            if self.audio_id(side).trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "cycle {} has an empty {} audio id",
                    self.id, side
                )));
            }
        }
        Ok(())
    }
}

/// Which audio reference of a cycle an operation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSide {
    /// Prompt (known language)
    Known,
    /// First target rendition
    Voice1,
    /// Second target rendition
    Voice2,
}

impl CycleSide {
    pub const ALL: [CycleSide; 3] = [CycleSide::Known, CycleSide::Voice1, CycleSide::Voice2];
}

impl fmt::Display for CycleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleSide::Known => write!(f, "known"),
            CycleSide::Voice1 => write!(f, "voice1"),
            CycleSide::Voice2 => write!(f, "voice2"),
        }
    }
}

/// Resolved audio for one audio reference
///
/// Either bytes held in memory (offline/cached playback) or a remote URI
/// (streamed playback).
#[derive(Clone, PartialEq, Eq)]
pub enum AudioSource {
    Blob {
        data: Arc<[u8]>,
        mime_type: Option<String>,
    },
    Remote {
        uri: String,
    },
}

impl AudioSource {
    pub fn blob(data: impl Into<Arc<[u8]>>) -> Self {
        AudioSource::Blob {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn remote(uri: impl Into<String>) -> Self {
        AudioSource::Remote { uri: uri.into() }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, AudioSource::Blob { .. })
    }
}

// Blob payloads can be megabytes; keep Debug output to the length
impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Blob { data, mime_type } => f
                .debug_struct("Blob")
                .field("len", &data.len())
                .field("mime_type", mime_type)
                .finish(),
            AudioSource::Remote { uri } => f.debug_struct("Remote").field("uri", uri).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_id_by_side() {
        let cycle = Cycle::new("c1", "k1", "v1", "v2", 500);
        assert_eq!(cycle.audio_id(CycleSide::Known), "k1");
        assert_eq!(cycle.audio_id(CycleSide::Voice1), "v1");
        assert_eq!(cycle.audio_id(CycleSide::Voice2), "v2");
        assert_eq!(cycle.audio_ids(), ["k1", "v1", "v2"]);
    }

    #[test]
    fn test_validate_rejects_empty_ids() {
        assert!(Cycle::new("c1", "k1", "v1", "v2", 0).validate().is_ok());
        assert!(matches!(
            Cycle::new(" ", "k1", "v1", "v2", 0).validate(),
            Err(Error::InvalidInput(_))
        ));

        let err = Cycle::new("c1", "k1", "", "v2", 0).validate().unwrap_err();
        assert!(err.to_string().contains("voice1"));
    }

    #[test]
    fn test_cycle_deserializes_from_toml() {
        let cycle: Cycle = toml::from_str(
            r#"
            id = "S0001L01"
            pause_duration_ms = 2500

            [known]
            audio_id = "k-1"
            text = "I want"

            [target]
            voice1_audio_id = "t1-1"
            voice2_audio_id = "t2-1"
            text = "Quiero"
            "#,
        )
        .unwrap();

        assert_eq!(cycle.id, "S0001L01");
        assert_eq!(cycle.pause_duration_ms, 2500);
        assert_eq!(cycle.known.text, "I want");
        assert_eq!(cycle.target.voice2_audio_id, "t2-1");
    }

    #[test]
    fn test_audio_source_debug_hides_payload() {
        let source = AudioSource::blob(vec![0u8; 4096]);
        let debug = format!("{:?}", source);
        assert!(debug.contains("len: 4096"));
        assert!(source.is_blob());
        assert!(!AudioSource::remote("https://cdn/a.mp3").is_blob());
    }
}
