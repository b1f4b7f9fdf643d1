//! Cycle phase state machine
//!
//! Drives one cycle through PROMPT -> PAUSE -> VOICE_1 -> VOICE_2 -> IDLE on the
//! single shared output handle.
//!
//! **Single flight:** starting a cycle cancels (does not wait for) whatever
//! cycle is in flight. Every flight carries a generation number; a flight may
//! only write the playback state while its generation is current, so a
//! superseded or stopped flight can never overwrite its successor's state or
//! resolve successfully.

use super::segment::{self, lock_resources, WatchdogTiming};
use super::state::PlaybackState;
use crate::audio::{AudioOutput, AudioResourceManager, ObjectUrlFactory};
use crate::content::AudioResolver;
use crate::error::{Error, Result};
use crate::state::SharedState;
use cycle_common::events::{CyclePhase, PlayerEvent, SegmentOutcome, WatchdogKind};
use cycle_common::{time, Cycle, CycleSide, PlayerConfig};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The cycle currently owning the output
#[derive(Debug, Clone)]
struct ActiveCycle {
    cycle_id: String,
    attempt_id: Uuid,
}

/// Flight bookkeeping, guarded by one mutex together with state writes
struct Flight {
    generation: u64,
    cancel: CancellationToken,
    active: Option<ActiveCycle>,
}

/// One `play_cycle` invocation
struct Attempt<'a> {
    cycle: &'a Cycle,
    attempt_id: Uuid,
    generation: u64,
    cancel: CancellationToken,
}

/// Halts the flight if the `play_cycle` future is dropped mid-cycle
struct FlightGuard<'a> {
    player: &'a CyclePlayer,
    generation: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.player.halt(Some(self.generation));
        }
    }
}

/// Cycle player - the phase state machine
///
/// Sole owner of the audio resources: nothing else touches the output handle
/// or the temporary URL slot.
pub struct CyclePlayer {
    resources: Arc<Mutex<AudioResourceManager>>,
    resolver: Arc<dyn AudioResolver>,
    state: Arc<SharedState>,
    timing: WatchdogTiming,
    flight: Mutex<Flight>,
}

impl CyclePlayer {
    /// Create a player around an output handle that lives as long as the player
    pub fn new(
        output: Arc<dyn AudioOutput>,
        object_urls: Arc<dyn ObjectUrlFactory>,
        resolver: Arc<dyn AudioResolver>,
        state: Arc<SharedState>,
        config: &PlayerConfig,
    ) -> Self {
        info!(
            "Creating cycle player (stall check {:?}, safety timeout {:?})",
            config.stall_check_interval(),
            config.safety_timeout()
        );
        Self {
            resources: Arc::new(Mutex::new(AudioResourceManager::new(output, object_urls))),
            resolver,
            state,
            timing: WatchdogTiming::from_config(config),
            flight: Mutex::new(Flight {
                generation: 0,
                cancel: CancellationToken::new(),
                active: None,
            }),
        }
    }

    /// Play one cycle through all four phases
    ///
    /// Resolves once VOICE_2 settles. Fails with `SourceNotFound` when an audio
    /// reference cannot be resolved, `Media` on a device error, and `Aborted`
    /// when `stop()` or a newer `play_cycle` cancels this one. Stalled or
    /// timed-out segments are skipped, not failed.
    pub async fn play_cycle(&self, cycle: &Cycle) -> Result<()> {
        let attempt = self.begin(cycle);
        let mut guard = FlightGuard {
            player: self,
            generation: attempt.generation,
            armed: true,
        };

        let result = match cycle.validate() {
            Ok(()) => self.run_phases(&attempt).await,
            Err(e) => Err(Error::InvalidCycle(e.to_string())),
        };

        guard.armed = false;
        self.finish(&attempt, result)
    }

    /// Cancel whatever is playing
    ///
    /// Cancels the pending pause delay or segment (its watchdog timers and
    /// device listener go with it), pauses and rewinds the output, and forces
    /// IDLE synchronously. No-op when nothing is playing.
    pub fn stop(&self) {
        self.halt(None);
    }

    /// Current playback snapshot
    pub fn playback_state(&self) -> PlaybackState {
        self.state.playback_state()
    }

    pub fn is_playing(&self) -> bool {
        self.state.playback_state().is_playing
    }

    /// Currently live temporary URL, if any
    pub fn temp_uri(&self) -> Option<String> {
        lock_resources(&self.resources).temp_uri().map(str::to_string)
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.state
    }

    fn lock_flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new flight, superseding any in-flight cycle
    fn begin<'a>(&self, cycle: &'a Cycle) -> Attempt<'a> {
        let attempt_id = Uuid::new_v4();
        let (generation, cancel, superseded, old_phase) = {
            let mut flight = self.lock_flight();
            flight.cancel.cancel();
            let superseded = flight.active.take();
            flight.generation += 1;
            flight.cancel = CancellationToken::new();
            flight.active = Some(ActiveCycle {
                cycle_id: cycle.id.clone(),
                attempt_id,
            });
            let old = self
                .state
                .replace_playback(PlaybackState::playing(CyclePhase::Prompt));
            (flight.generation, flight.cancel.clone(), superseded, old.phase)
        };

        if let Some(previous) = superseded {
            info!("Cycle {} superseded by {}", previous.cycle_id, cycle.id);
            lock_resources(&self.resources).output().pause();
            self.state.broadcast_event(PlayerEvent::CycleAborted {
                cycle_id: previous.cycle_id,
                attempt_id: previous.attempt_id,
                timestamp: time::now(),
            });
        }

        info!("Playing cycle {}", cycle.id);
        self.emit_phase(cycle, attempt_id, old_phase, CyclePhase::Prompt);

        Attempt {
            cycle,
            attempt_id,
            generation,
            cancel,
        }
    }

    async fn run_phases(&self, attempt: &Attempt<'_>) -> Result<()> {
        self.play_side(attempt, CycleSide::Known).await?;

        self.enter_phase(attempt, CyclePhase::Pause)?;
        let pause = time::millis_to_duration(attempt.cycle.pause_duration_ms);
        tokio::select! {
            biased;
            _ = attempt.cancel.cancelled() => return Err(Error::Aborted),
            _ = tokio::time::sleep(pause) => {}
        }

        self.enter_phase(attempt, CyclePhase::Voice1)?;
        self.play_side(attempt, CycleSide::Voice1).await?;

        self.enter_phase(attempt, CyclePhase::Voice2)?;
        self.play_side(attempt, CycleSide::Voice2).await
    }

    /// Resolve and play one side of the cycle
    async fn play_side(&self, attempt: &Attempt<'_>, side: CycleSide) -> Result<()> {
        let audio_id = attempt.cycle.audio_id(side);

        let source = tokio::select! {
            biased;
            _ = attempt.cancel.cancelled() => return Err(Error::Aborted),
            source = self.resolver.resolve_audio(audio_id) => source,
        };
        let source = source.ok_or_else(|| Error::SourceNotFound {
            cycle_id: attempt.cycle.id.clone(),
            side,
            audio_id: audio_id.to_string(),
        })?;

        let outcome =
            segment::play_segment(&self.resources, &source, side, self.timing, &attempt.cancel)
                .await?;

        self.state.broadcast_event(PlayerEvent::SegmentSettled {
            cycle_id: attempt.cycle.id.clone(),
            attempt_id: attempt.attempt_id,
            side,
            outcome,
            timestamp: time::now(),
        });

        let kind = match outcome {
            SegmentOutcome::Completed => return Ok(()),
            SegmentOutcome::Stalled => WatchdogKind::Stall,
            SegmentOutcome::TimedOut => WatchdogKind::SafetyTimeout,
        };
        let total = self.state.increment_watchdog_interventions();
        warn!(
            "[WATCHDOG] {} intervention on cycle {} ({} side), {} total",
            kind, attempt.cycle.id, side, total
        );
        self.state.broadcast_event(PlayerEvent::WatchdogIntervention {
            cycle_id: attempt.cycle.id.clone(),
            side,
            kind,
            interventions_total: total,
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Move to the next phase if this flight still owns the state
    fn enter_phase(&self, attempt: &Attempt<'_>, phase: CyclePhase) -> Result<()> {
        let old_phase = {
            let flight = self.lock_flight();
            if flight.generation != attempt.generation {
                return Err(Error::Aborted);
            }
            self.state.replace_playback(PlaybackState::playing(phase)).phase
        };
        self.emit_phase(attempt.cycle, attempt.attempt_id, old_phase, phase);
        Ok(())
    }

    /// Write the terminal state of a flight; false if it was superseded
    fn settle_flight(&self, attempt: &Attempt<'_>, terminal: PlaybackState) -> bool {
        let old_phase = {
            let mut flight = self.lock_flight();
            if flight.generation != attempt.generation {
                return false;
            }
            flight.active = None;
            self.state.replace_playback(terminal).phase
        };
        self.emit_phase(attempt.cycle, attempt.attempt_id, old_phase, CyclePhase::Idle);
        true
    }

    fn finish(&self, attempt: &Attempt<'_>, result: Result<()>) -> Result<()> {
        let cycle_id = &attempt.cycle.id;
        match result {
            Ok(()) => {
                if !self.settle_flight(attempt, PlaybackState::idle(None)) {
                    debug!("Cycle {} finished after being cancelled", cycle_id);
                    return Err(Error::Aborted);
                }
                info!("Cycle {} completed", cycle_id);
                self.state.broadcast_event(PlayerEvent::CycleCompleted {
                    cycle_id: cycle_id.clone(),
                    attempt_id: attempt.attempt_id,
                    timestamp: time::now(),
                });
                Ok(())
            }
            Err(Error::Aborted) => {
                debug!("Cycle {} aborted", cycle_id);
                Err(Error::Aborted)
            }
            Err(e) => {
                if !self.settle_flight(attempt, PlaybackState::idle(Some(e.to_string()))) {
                    debug!("Cycle {} failed after being cancelled: {}", cycle_id, e);
                    return Err(Error::Aborted);
                }
                warn!("Cycle {} failed: {}", cycle_id, e);
                self.state.broadcast_event(PlayerEvent::CycleFailed {
                    cycle_id: cycle_id.clone(),
                    attempt_id: attempt.attempt_id,
                    error: e.to_string(),
                    timestamp: time::now(),
                });
                Err(e)
            }
        }
    }

    /// Cancel the active flight; with `only`, just if that generation is current
    fn halt(&self, only: Option<u64>) {
        let (stopped, old_phase) = {
            let mut flight = self.lock_flight();
            if only.is_some_and(|generation| generation != flight.generation) {
                return;
            }
            let Some(active) = flight.active.take() else {
                return;
            };
            flight.cancel.cancel();
            flight.generation += 1;
            let old = self.state.replace_playback(PlaybackState::idle(None));
            (active, old.phase)
        };

        {
            let mut resources = lock_resources(&self.resources);
            let output = resources.output();
            output.pause();
            output.rewind();
            resources.revoke_temp_uri();
        }

        info!("Stopped cycle {} in {}", stopped.cycle_id, old_phase);
        if old_phase != CyclePhase::Idle {
            self.state.broadcast_event(PlayerEvent::PhaseChanged {
                cycle_id: stopped.cycle_id.clone(),
                attempt_id: stopped.attempt_id,
                old_phase,
                new_phase: CyclePhase::Idle,
                timestamp: time::now(),
            });
        }
        self.state.broadcast_event(PlayerEvent::CycleAborted {
            cycle_id: stopped.cycle_id,
            attempt_id: stopped.attempt_id,
            timestamp: time::now(),
        });
    }

    fn emit_phase(&self, cycle: &Cycle, attempt_id: Uuid, old_phase: CyclePhase, new_phase: CyclePhase) {
        debug!("Cycle {}: {} -> {}", cycle.id, old_phase, new_phase);
        self.state.broadcast_event(PlayerEvent::PhaseChanged {
            cycle_id: cycle.id.clone(),
            attempt_id,
            old_phase,
            new_phase,
            timestamp: time::now(),
        });
    }
}
