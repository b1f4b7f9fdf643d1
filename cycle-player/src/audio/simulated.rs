//! Clock-driven simulated output device
//!
//! Plays nothing audible: each loaded source "plays" according to a
//! [`SimBehavior`] measured on the tokio clock, so it works under a paused
//! test clock as well as in real time. Behaviours can be scripted per load to
//! reproduce stalls, hangs and device errors.

use super::output::{AudioOutput, OutputEvent};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// How the next loaded source behaves once played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBehavior {
    /// Plays for the given duration, then signals end-of-media
    Complete(Duration),
    /// Position advances until `after`, then freezes while still "playing"
    Stall { after: Duration },
    /// Position keeps advancing but the source never ends
    Hang,
    /// Signals a device error with `code` after `after`
    Fail { after: Duration, code: u16 },
    /// `play()` is refused
    RejectPlay,
}

struct SimState {
    src: Option<String>,
    behavior: SimBehavior,
    scripted: VecDeque<SimBehavior>,
    /// Position accumulated before the current run
    base_position: Duration,
    /// Set while playing
    started_at: Option<Instant>,
    ended: bool,
    load_count: u64,
    loaded: Vec<String>,
    timer: Option<JoinHandle<()>>,
}

impl SimState {
    fn position(&self) -> Duration {
        let raw = match self.started_at {
            Some(start) => self.base_position + start.elapsed(),
            None => self.base_position,
        };
        match self.behavior {
            SimBehavior::Complete(limit)
            | SimBehavior::Stall { after: limit }
            | SimBehavior::Fail { after: limit, .. } => raw.min(limit),
            SimBehavior::Hang | SimBehavior::RejectPlay => raw,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Simulated reusable output handle
pub struct SimulatedOutput {
    default_duration: Duration,
    inner: Arc<Mutex<SimState>>,
    events: broadcast::Sender<OutputEvent>,
}

impl SimulatedOutput {
    /// Every unscripted source completes after `default_duration`
    pub fn new(default_duration: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            default_duration,
            inner: Arc::new(Mutex::new(SimState {
                src: None,
                behavior: SimBehavior::Complete(default_duration),
                scripted: VecDeque::new(),
                base_position: Duration::ZERO,
                started_at: None,
                ended: false,
                load_count: 0,
                loaded: Vec::new(),
                timer: None,
            })),
            events,
        }
    }

    /// Queue behaviours for the next loads, in order
    pub fn script(&self, behaviors: impl IntoIterator<Item = SimBehavior>) {
        self.lock().scripted.extend(behaviors);
    }

    /// Every URI loaded so far, oldest first
    pub fn loaded_sources(&self) -> Vec<String> {
        self.lock().loaded.clone()
    }

    pub fn load_count(&self) -> u64 {
        self.lock().load_count
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn the end-of-media or error timer for the current run
    fn schedule(&self, state: &mut SimState) -> Result<()> {
        let (deadline, code) = match state.behavior {
            SimBehavior::Complete(d) => (d, None),
            SimBehavior::Fail { after, code } => (after, Some(code)),
            SimBehavior::Stall { .. } | SimBehavior::Hang | SimBehavior::RejectPlay => {
                return Ok(())
            }
        };

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::AudioOutput("simulated output needs a tokio runtime".to_string()))?;

        let remaining = deadline.saturating_sub(state.base_position);
        let load_seq = state.load_count;
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();

        state.cancel_timer();
        state.timer = Some(handle.spawn(async move {
            tokio::time::sleep(remaining).await;

            let event = {
                let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
                if state.load_count != load_seq || state.started_at.is_none() {
                    return;
                }
                state.base_position = deadline;
                state.started_at = None;
                state.ended = true;
                state.timer = None;
                let src = state.src.clone().unwrap_or_default();
                match code {
                    None => OutputEvent::Ended { src },
                    Some(code) => OutputEvent::Error { src, code },
                }
            };

            trace!("Simulated output event: {:?}", event);
            let _ = events.send(event);
        }));
        Ok(())
    }
}

impl AudioOutput for SimulatedOutput {
    fn load(&self, uri: &str) -> Result<()> {
        let mut state = self.lock();
        state.cancel_timer();
        state.src = Some(uri.to_string());
        state.behavior = state
            .scripted
            .pop_front()
            .unwrap_or(SimBehavior::Complete(self.default_duration));
        state.base_position = Duration::ZERO;
        state.started_at = None;
        state.ended = false;
        state.load_count += 1;
        state.loaded.push(uri.to_string());
        trace!("Simulated output loaded {} ({:?})", uri, state.behavior);
        Ok(())
    }

    fn play(&self) -> Result<()> {
        let mut state = self.lock();
        if state.src.is_none() {
            return Err(Error::AudioOutput("no source loaded".to_string()));
        }
        if state.behavior == SimBehavior::RejectPlay {
            return Err(Error::AudioOutput("play() rejected by device".to_string()));
        }
        if state.started_at.is_some() || state.ended {
            return Ok(());
        }
        state.started_at = Some(Instant::now());
        self.schedule(&mut state)
    }

    fn pause(&self) {
        let mut state = self.lock();
        if state.started_at.is_some() {
            state.base_position = state.position();
            state.started_at = None;
        }
        state.cancel_timer();
    }

    fn rewind(&self) {
        let mut state = self.lock();
        let was_playing = state.started_at.is_some();
        state.cancel_timer();
        state.base_position = Duration::ZERO;
        state.ended = false;
        if was_playing {
            state.started_at = Some(Instant::now());
            if let Err(e) = self.schedule(&mut state) {
                trace!("Simulated output could not restart after rewind: {}", e);
            }
        }
    }

    fn position(&self) -> Duration {
        self.lock().position()
    }

    fn is_playing(&self) -> bool {
        let state = self.lock();
        state.started_at.is_some() && !state.ended
    }

    fn subscribe(&self) -> broadcast::Receiver<OutputEvent> {
        self.events.subscribe()
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        self.lock().cancel_timer();
    }
}
