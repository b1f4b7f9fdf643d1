//! Player wired to a simulated output device

use super::{CountingObjectUrls, MapResolver};
use cycle_common::events::{CyclePhase, PlayerEvent};
use cycle_common::{Cycle, PlayerConfig};
use cycle_player::audio::SimulatedOutput;
use cycle_player::playback::CyclePlayer;
use cycle_player::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Default simulated segment length
pub const SEGMENT: Duration = Duration::from_secs(2);

/// Cycle whose audio ids are `<id>-known`, `<id>-v1` and `<id>-v2`
pub fn test_cycle(id: &str, pause_ms: u64) -> Cycle {
    Cycle::new(
        id,
        format!("{}-known", id),
        format!("{}-v1", id),
        format!("{}-v2", id),
        pause_ms,
    )
}

pub struct TestPlayer {
    pub output: Arc<SimulatedOutput>,
    pub urls: Arc<CountingObjectUrls>,
    pub resolver: Arc<MapResolver>,
    pub state: Arc<SharedState>,
    pub player: Arc<CyclePlayer>,
}

impl TestPlayer {
    pub fn new(resolver: MapResolver) -> Self {
        Self::with_config(resolver, &PlayerConfig::default())
    }

    pub fn with_config(resolver: MapResolver, config: &PlayerConfig) -> Self {
        let output = Arc::new(SimulatedOutput::new(SEGMENT));
        let urls = Arc::new(CountingObjectUrls::new());
        let resolver = Arc::new(resolver);
        let state = Arc::new(SharedState::new(1000));
        let player = Arc::new(CyclePlayer::new(
            output.clone(),
            urls.clone(),
            resolver.clone(),
            state.clone(),
            config,
        ));
        Self {
            output,
            urls,
            resolver,
            state,
            player,
        }
    }

    /// Player that can resolve every audio id of `cycles`
    pub fn for_cycles(cycles: &[Cycle]) -> Self {
        Self::new(MapResolver::with_blobs_for(cycles))
    }
}

/// Everything currently buffered on the receiver
pub fn drain_events(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// New phases from the PhaseChanged events, in order
pub fn phase_sequence(events: &[PlayerEvent]) -> Vec<CyclePhase> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::PhaseChanged { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect()
}
