//! Single audio segment playback
//!
//! One segment settles exactly once, through whichever of these fires first:
//! - natural completion (device end-of-media)
//! - stall watchdog (position unchanged across two samples while playing)
//! - absolute safety timeout
//! - device error
//! - cancellation (stop or superseding cycle)
//!
//! Stall and timeout settle successfully so a broken segment never freezes
//! the session. The `select!` below is the settle-once race; the watchdog
//! timers and the event listener are locals of that race, and the temporary
//! URL lease is released on drop, so cleanup runs once on every path.

use crate::audio::{AudioOutput, AudioResourceManager, OutputEvent};
use crate::error::{Error, Result};
use cycle_common::events::{MediaErrorKind, SegmentOutcome};
use cycle_common::{AudioSource, CycleSide};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Watchdog cadence and ceiling for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTiming {
    pub stall_check_interval: Duration,
    pub safety_timeout: Duration,
}

impl WatchdogTiming {
    pub fn from_config(config: &cycle_common::PlayerConfig) -> Self {
        Self {
            stall_check_interval: config.stall_check_interval(),
            safety_timeout: config.safety_timeout(),
        }
    }
}

pub(crate) fn lock_resources(
    resources: &Mutex<AudioResourceManager>,
) -> MutexGuard<'_, AudioResourceManager> {
    resources.lock().unwrap_or_else(|e| e.into_inner())
}

/// Releases a temporary URL back to the resource manager when dropped
struct TempUriLease {
    resources: Arc<Mutex<AudioResourceManager>>,
    uri: Option<String>,
}

impl Drop for TempUriLease {
    fn drop(&mut self) {
        if let Some(uri) = self.uri.take() {
            lock_resources(&self.resources).release(&uri);
        }
    }
}

/// Play one resolved source on the shared output until it settles
pub(crate) async fn play_segment(
    resources: &Arc<Mutex<AudioResourceManager>>,
    source: &AudioSource,
    side: CycleSide,
    timing: WatchdogTiming,
    cancel: &CancellationToken,
) -> Result<SegmentOutcome> {
    if cancel.is_cancelled() {
        return Err(Error::Aborted);
    }

    let (output, prepared) = {
        let mut manager = lock_resources(resources);
        let prepared = manager.prepare(source);
        (manager.output(), prepared)
    };
    let _lease = TempUriLease {
        resources: Arc::clone(resources),
        uri: prepared.temporary.then(|| prepared.uri.clone()),
    };

    // Listen before loading so an immediate end-of-media is not missed
    let mut events = output.subscribe();
    output.load(&prepared.uri)?;
    output.play()?;
    debug!("Segment {} playing {}", side, prepared.uri);

    let outcome = race(output.as_ref(), &mut events, &prepared.uri, side, timing, cancel).await;

    if let Ok(settled) = &outcome {
        if settled.is_watchdog() {
            // Skip forward: silence the stuck source before the next phase
            output.pause();
        }
    }
    outcome
}

async fn race(
    output: &dyn AudioOutput,
    events: &mut broadcast::Receiver<OutputEvent>,
    uri: &str,
    side: CycleSide,
    timing: WatchdogTiming,
    cancel: &CancellationToken,
) -> Result<SegmentOutcome> {
    let started = Instant::now();
    let safety = tokio::time::sleep(timing.safety_timeout);
    tokio::pin!(safety);

    let mut stall_check = tokio::time::interval_at(
        started + timing.stall_check_interval,
        timing.stall_check_interval,
    );
    stall_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_position: Option<Duration> = None;
    let mut listening = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("Segment {} cancelled", side);
                return Err(Error::Aborted);
            }

            event = events.recv(), if listening => match event {
                Ok(OutputEvent::Ended { src }) if src == uri => {
                    debug!("Segment {} completed after {:?}", side, started.elapsed());
                    return Ok(SegmentOutcome::Completed);
                }
                Ok(OutputEvent::Error { src, code }) if src == uri => {
                    let kind = MediaErrorKind::from_code(code);
                    warn!("Segment {} device error (code {}): {}", side, code, kind);
                    return Err(Error::Media { side, kind });
                }
                Ok(other) => trace!("Ignoring event for another source: {:?}", other),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Segment {} listener lagged, {} events skipped", side, skipped);
                }
                Err(RecvError::Closed) => {
                    warn!("Output event stream closed, segment {} relies on watchdogs", side);
                    listening = false;
                }
            },

            _ = &mut safety => {
                warn!(
                    "[WATCHDOG] Segment {} exceeded {:?} safety ceiling, skipping forward",
                    side, timing.safety_timeout
                );
                return Ok(SegmentOutcome::TimedOut);
            }

            _ = stall_check.tick() => {
                let position = output.position();
                if output.is_playing() && last_position == Some(position) {
                    warn!(
                        "[WATCHDOG] Segment {} stalled at {:?}, skipping forward",
                        side, position
                    );
                    return Ok(SegmentOutcome::Stalled);
                }
                last_position = Some(position);
            }
        }
    }
}
