//! Cycle playback, queue management and session orchestration

pub mod engine;
pub mod queue_manager;
pub mod segment;
pub mod session;
pub mod state;

pub use engine::CyclePlayer;
pub use queue_manager::SessionQueue;
pub use segment::WatchdogTiming;
pub use session::{CycleOutcome, RunSummary, Session, StopReason};
pub use state::PlaybackState;
