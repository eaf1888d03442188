//! Shared accumulators
//!
//! Every mutation from the event handler and every drain by the scheduler or
//! the notification aggregator goes through one [`tokio::sync::Mutex`] around
//! [`Accumulators`]. An event recorded under the lock lands entirely in one
//! cycle: either before a drain or after it.

use crate::events::ChangeEvent;
use mediawatch_core::Destination;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Changes observed since the last cycle, in arrival order
#[derive(Debug, Default)]
pub struct ChangeRecorder {
    changes: Vec<ChangeEvent>,
}

impl ChangeRecorder {
    pub fn record(&mut self, change: ChangeEvent) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[ChangeEvent] {
        &self.changes
    }

    /// Take every recorded change, leaving the recorder empty
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }
}

/// Deduplicated destinations awaiting a rescan
#[derive(Debug, Default)]
pub struct ScanRequestSet {
    pending: HashSet<Destination>,
}

impl ScanRequestSet {
    /// Returns `true` if the destination was not already pending
    pub fn add(&mut self, destination: Destination) -> bool {
        self.pending.insert(destination)
    }

    pub fn contains(&self, destination: &Destination) -> bool {
        self.pending.contains(destination)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> HashSet<Destination> {
        std::mem::take(&mut self.pending)
    }
}

/// Changes waiting for a chat notification
///
/// Cleared only by [`NotificationBatch::acknowledge`] after a successful
/// delivery; a failed delivery leaves it untouched.
#[derive(Debug, Default)]
pub struct NotificationBatch {
    entries: Vec<ChangeEvent>,
    last_flush: Option<Instant>,
}

impl NotificationBatch {
    pub fn push(&mut self, change: ChangeEvent) {
        self.entries.push(change);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChangeEvent] {
        &self.entries
    }

    pub fn last_flush(&self) -> Option<Instant> {
        self.last_flush
    }

    /// Non-empty and at least one window since the last successful flush
    pub fn is_due(&self, now: Instant, window: Duration) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        match self.last_flush {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= window,
        }
    }

    /// Copy of the pending entries, for delivery outside the lock
    pub fn snapshot(&self) -> Vec<ChangeEvent> {
        self.entries.clone()
    }

    /// Remove the first `delivered` entries and record the flush time
    ///
    /// Entries appended while the snapshot was being delivered stay queued.
    pub fn acknowledge(&mut self, delivered: usize, now: Instant) {
        let delivered = delivered.min(self.entries.len());
        self.entries.drain(..delivered);
        self.last_flush = Some(now);
    }

    /// Drop everything still pending, returning how many entries were lost
    pub fn discard(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

/// What one scan cycle drained
#[derive(Debug, Default)]
pub struct CycleSnapshot {
    pub changes: Vec<ChangeEvent>,
    pub scans: HashSet<Destination>,
}

impl CycleSnapshot {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.scans.is_empty()
    }
}

/// Everything guarded by the shared lock
#[derive(Debug, Default)]
pub struct Accumulators {
    pub changes: ChangeRecorder,
    pub scans: ScanRequestSet,
    pub notifications: NotificationBatch,
}

impl Accumulators {
    /// Take the cycle state, leaving both the recorder and the request set empty
    ///
    /// The notification batch is independent and is not touched.
    pub fn drain_cycle(&mut self) -> CycleSnapshot {
        CycleSnapshot {
            changes: self.changes.drain(),
            scans: self.scans.drain(),
        }
    }
}

pub type SharedState = Arc<Mutex<Accumulators>>;

pub fn shared_state() -> SharedState {
    Arc::new(Mutex::new(Accumulators::default()))
}
