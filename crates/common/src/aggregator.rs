//! Change aggregation for reconnect scheduling
//!
//! The aggregator coalesces a burst of filesystem activity into a single
//! pending-reconnect state: one dirty flag plus the time of the most recent
//! qualifying change. The service loop owns the aggregator and is its only
//! reader and writer; watcher events reach it through a channel, so no lock
//! guards these two fields.
//!
//! Timestamps use [`tokio::time::Instant`] so the paused test clock can drive
//! the quiescence window deterministically.

use std::time::Duration;

use tokio::time::Instant;

use crate::event::ChangeEvent;

/// Accumulates qualifying changes until the controller resets it.
///
/// Invariant: `last_change` is `Some` iff `dirty` is true, and then holds the
/// observation time of the most recent qualifying event.
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    dirty: bool,
    last_change: Option<Instant>,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one change event.
    ///
    /// Qualifying events (see [`ChangeKind::is_significant`]) mark the
    /// aggregator dirty and restart the quiescence clock. Returns whether the
    /// event qualified.
    ///
    /// [`ChangeKind::is_significant`]: crate::event::ChangeKind::is_significant
    pub fn record(&mut self, event: &ChangeEvent) -> bool {
        if !event.kind.is_significant() {
            return false;
        }
        self.dirty = true;
        self.last_change = Some(Instant::now());
        true
    }

    /// Whether a reconnect is due: dirty, and at least `quiescence` has
    /// elapsed since the last qualifying change.
    pub fn is_due(&self, quiescence: Duration) -> bool {
        match self.last_change {
            Some(last) if self.dirty => last.elapsed() >= quiescence,
            _ => false,
        }
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the pending state. Idempotent.
    pub fn reset(&mut self) {
        self.dirty = false;
        self.last_change = None;
    }
}
