//! Session orchestration
//!
//! Ties the queue, the degradation controller and the player together:
//! schedule, pick what can actually play, play it, then record the result.

use super::engine::CyclePlayer;
use super::queue_manager::SessionQueue;
use crate::degradation::DegradationController;
use cycle_common::events::{DegradationLevel, PlayerEvent};
use cycle_common::{time, Cycle};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consecutive failures after which `run` gives up
pub const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// Result of one `play_next` step
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Cycle completed all phases at the given degradation level
    Played { cycle: Cycle, level: DegradationLevel },
    /// Cycle failed (missing source or device error)
    Failed { cycle: Cycle, error: String },
    /// Cycle was stopped or superseded
    Aborted,
    /// Queue is complete
    Exhausted,
    /// Nothing cached and nothing played yet
    NothingPlayable,
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QueueComplete,
    NothingPlayable,
    Cancelled,
    Aborted,
    TooManyFailures,
    LimitReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::QueueComplete => write!(f, "queue complete"),
            StopReason::NothingPlayable => write!(f, "nothing playable"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Aborted => write!(f, "aborted"),
            StopReason::TooManyFailures => write!(f, "too many consecutive failures"),
            StopReason::LimitReached => write!(f, "cycle limit reached"),
        }
    }
}

/// Tally of a `run` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub played: usize,
    /// Subset of `played` that was substitute content
    pub degraded: usize,
    pub failed: usize,
    pub reason: StopReason,
}

/// One learner session
pub struct Session {
    queue: SessionQueue,
    controller: DegradationController,
    player: Arc<CyclePlayer>,
}

impl Session {
    /// Create a session and take an initial snapshot of the cached pool
    pub fn new(queue: SessionQueue, mut controller: DegradationController, player: Arc<CyclePlayer>) -> Self {
        controller.refresh_cached_pool();
        Self {
            queue,
            controller,
            player,
        }
    }

    /// Play whatever should play next
    ///
    /// Never fails: every error surfaces as a `CycleOutcome`. The queue only
    /// advances when the scheduled cycle itself was played; a substitute
    /// leaves the scheduled cycle in place for when it becomes available.
    pub async fn play_next(&mut self) -> CycleOutcome {
        if self.queue.is_complete() {
            return CycleOutcome::Exhausted;
        }

        let scheduled = self.queue.current_cycle().cloned();
        let Some(cycle) = self.controller.next_playable_cycle(scheduled.as_ref()) else {
            return CycleOutcome::NothingPlayable;
        };
        let level = self.controller.degradation_level();
        let is_scheduled = scheduled.as_ref().is_some_and(|s| s.id == cycle.id);

        if !is_scheduled {
            debug!("Substituting cycle {} at level {}", cycle.id, level);
        }

        match self.player.play_cycle(&cycle).await {
            Ok(()) => {
                self.controller.mark_cycle_as_played(&cycle);
                if is_scheduled {
                    self.queue.mark_cycle_complete();
                    self.publish_progress();
                }
                CycleOutcome::Played { cycle, level }
            }
            Err(e) if e.is_aborted() => CycleOutcome::Aborted,
            Err(e) => {
                if is_scheduled {
                    warn!("Skipping cycle {}: {}", cycle.id, e);
                    self.queue.skip_to_next();
                    self.publish_progress();
                }
                CycleOutcome::Failed {
                    cycle,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Play until the queue completes, nothing can play, or `cancel` fires
    ///
    /// `limit` caps the number of `play_next` steps.
    pub async fn run(&mut self, cancel: CancellationToken, limit: Option<usize>) -> RunSummary {
        let player = Arc::clone(&self.player);
        let mut summary = RunSummary {
            played: 0,
            degraded: 0,
            failed: 0,
            reason: StopReason::QueueComplete,
        };
        let mut consecutive_failures = 0;
        let mut steps = 0;

        info!("Session started: {} cycles queued", self.queue.len());
        self.publish_progress();

        summary.reason = loop {
            if limit.is_some_and(|limit| steps >= limit) {
                break StopReason::LimitReached;
            }
            steps += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    player.stop();
                    break StopReason::Cancelled;
                }
                outcome = self.play_next() => outcome,
            };

            match outcome {
                CycleOutcome::Played { level, .. } => {
                    summary.played += 1;
                    if level != DegradationLevel::Normal {
                        summary.degraded += 1;
                    }
                    consecutive_failures = 0;
                }
                CycleOutcome::Failed { .. } => {
                    summary.failed += 1;
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        break StopReason::TooManyFailures;
                    }
                }
                CycleOutcome::Aborted => break StopReason::Aborted,
                CycleOutcome::Exhausted => break StopReason::QueueComplete,
                CycleOutcome::NothingPlayable => break StopReason::NothingPlayable,
            }
        };

        info!(
            "Session ended ({}): {} played, {} degraded, {} failed",
            summary.reason, summary.played, summary.degraded, summary.failed
        );
        summary
    }

    /// Cancel the cycle in flight
    pub fn stop(&self) {
        self.player.stop();
    }

    /// Mirror connectivity and re-snapshot the cached pool
    pub fn set_online(&mut self, online: bool) {
        self.controller.set_online(online);
        self.controller.refresh_cached_pool();
    }

    pub fn refresh_cached_pool(&mut self) -> usize {
        self.controller.refresh_cached_pool()
    }

    pub fn player(&self) -> &Arc<CyclePlayer> {
        &self.player
    }

    pub fn queue(&self) -> &SessionQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut SessionQueue {
        &mut self.queue
    }

    pub fn controller(&self) -> &DegradationController {
        &self.controller
    }

    fn publish_progress(&self) {
        let progress_percent = self.queue.progress_percent();
        debug!(
            "Queue progress: {}/{} ({}%)",
            self.queue.cursor(),
            self.queue.len(),
            progress_percent
        );
        self.player
            .shared_state()
            .broadcast_event(PlayerEvent::QueueProgress {
                cursor: self.queue.cursor(),
                total: self.queue.len(),
                progress_percent,
                timestamp: time::now(),
            });
    }
}
