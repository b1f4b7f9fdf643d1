//! # Cycle Common Library
//!
//! Shared code for the cycle playback engine and its consumers:
//! - Cycle data model (cycles, audio sources, sides)
//! - Event types (PlayerEvent enum) and the EventBus
//! - Configuration loading
//! - Timestamp helpers

pub mod config;
pub mod cycle;
pub mod error;
pub mod events;
pub mod time;

pub use config::PlayerConfig;
pub use cycle::{AudioSource, Cycle, CycleSide, KnownSide, TargetSide};
pub use error::{Error, Result};
