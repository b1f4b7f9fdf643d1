//! Test helper modules for cycle-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MapResolver: in-memory audio resolver with optional latency
//! - CountingObjectUrls: object URL factory that tracks peak live URLs
//! - TestPlayer: player wired to a simulated output

#![allow(dead_code)]

pub mod harness;
pub mod map_resolver;
pub mod object_urls;

pub use harness::{drain_events, phase_sequence, test_cycle, TestPlayer};
pub use map_resolver::MapResolver;
pub use object_urls::CountingObjectUrls;
