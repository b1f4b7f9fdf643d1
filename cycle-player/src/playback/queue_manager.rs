//! Session queue
//!
//! Ordered cycles plus a cursor. Pure index arithmetic: knows nothing about
//! how playback happens.
//!
//! The cursor lives in `[0, len]`; `cursor == len` means the session is
//! complete. "Complete" and "skip" both advance the cursor by one; the
//! distinction only matters to the caller's analytics.

use cycle_common::{time, Cycle};
use tracing::debug;

/// Cycle queue with a cursor
#[derive(Debug, Clone, Default)]
pub struct SessionQueue {
    cycles: Vec<Cycle>,
    cursor: usize,
}

impl SessionQueue {
    /// Create a queue positioned at the first cycle
    pub fn new(cycles: Vec<Cycle>) -> Self {
        Self { cycles, cursor: 0 }
    }

    /// Replace the queue contents and rewind the cursor
    pub fn load(&mut self, cycles: Vec<Cycle>) {
        debug!("Loaded session queue with {} cycles", cycles.len());
        self.cycles = cycles;
        self.cursor = 0;
    }

    /// Cycle at the cursor, None once the queue is complete
    pub fn current_cycle(&self) -> Option<&Cycle> {
        self.cycles.get(self.cursor)
    }

    /// Cycle after the cursor, without moving it
    pub fn next_cycle(&self) -> Option<&Cycle> {
        self.cycles.get(self.cursor + 1)
    }

    /// Advance past the current cycle after it played
    pub fn mark_cycle_complete(&mut self) {
        self.advance();
    }

    /// Advance past the current cycle without playing it
    pub fn skip_to_next(&mut self) {
        self.advance();
    }

    /// Move the cursor to `index`; out-of-range indexes are ignored
    ///
    /// Returns true if the cursor moved.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.cycles.len() {
            debug!(
                "Ignoring jump to {} (queue has {} cycles)",
                index,
                self.cycles.len()
            );
            return false;
        }
        self.cursor = index;
        true
    }

    /// Rewind to the first cycle
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.cycles.len()
    }

    /// Percentage of cycles passed, 0 for an empty queue
    pub fn progress_percent(&self) -> u8 {
        time::percent(self.cursor, self.cycles.len())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Cycles from the cursor to the end
    pub fn remaining(&self) -> &[Cycle] {
        &self.cycles[self.cursor.min(self.cycles.len())..]
    }

    fn advance(&mut self) {
        if self.cursor < self.cycles.len() {
            self.cursor += 1;
        }
    }
}
