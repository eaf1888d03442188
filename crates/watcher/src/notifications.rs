//! Debounced chat notifications
//!
//! The aggregator wakes once per window. When the batch is non-empty and a
//! full window has passed since the last successful flush, it renders one
//! message for the whole batch and sends it. The batch is cleared only after
//! the chat accepted it; a failed send is retried, unchanged, on the next
//! wake-up.
//!
//! Because the flush time is taken after the send completes, a wake-up one
//! window after a flush usually finds slightly less than a window elapsed and
//! skips. Under sustained activity delivery can therefore lag by up to one
//! extra window.

use crate::events::{ChangeEvent, ChangeKind};
use crate::markup::{display_name, escape_html, SEPARATOR};
use crate::state::SharedState;
use mediawatch_core::{Destination, LibraryLabels};
use mediawatch_dispatch::ChatNotifier;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Filenames listed per group before collapsing into a count
pub const MAX_NAMES_PER_GROUP: usize = 5;

/// Result of one wake-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending
    Empty,
    /// Pending, but the window since the last flush has not elapsed
    NotDue,
    /// Delivered this many entries
    Sent(usize),
    /// Delivery of this many entries failed; they remain queued
    Failed(usize),
}

pub struct NotificationAggregator {
    state: SharedState,
    notifier: Arc<dyn ChatNotifier>,
    labels: Arc<LibraryLabels>,
    window: Duration,
}

impl NotificationAggregator {
    pub fn new(
        state: SharedState,
        notifier: Arc<dyn ChatNotifier>,
        labels: Arc<LibraryLabels>,
        window: Duration,
    ) -> Self {
        Self {
            state,
            notifier,
            labels,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Send the pending batch if it is due at `now`
    ///
    /// The lock is not held while the message is in flight. Entries appended
    /// during the send are kept for the next flush.
    pub async fn flush_if_due(&self, now: Instant) -> FlushOutcome {
        let batch = {
            let state = self.state.lock().await;
            if state.notifications.is_empty() {
                return FlushOutcome::Empty;
            }
            if !state.notifications.is_due(now, self.window) {
                return FlushOutcome::NotDue;
            }
            state.notifications.snapshot()
        };

        let message = batch_message(&batch, &self.labels);
        match self.notifier.send_message(&message).await {
            Ok(()) => {
                self.state
                    .lock()
                    .await
                    .notifications
                    .acknowledge(batch.len(), Instant::now());
                info!("Sent chat notification for {} change(s)", batch.len());
                FlushOutcome::Sent(batch.len())
            }
            Err(e) => {
                warn!(
                    "Chat notification for {} change(s) failed, will retry: {e}",
                    batch.len()
                );
                FlushOutcome::Failed(batch.len())
            }
        }
    }

    /// Wake every window until cancelled
    ///
    /// Whatever is still pending at shutdown is dropped.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.window, self.window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Notification aggregator started ({:?} window)", self.window);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush_if_due(Instant::now()).await;
                }
            }
        }

        let dropped = self.state.lock().await.notifications.discard();
        if dropped > 0 {
            warn!("Shutting down with {dropped} undelivered chat notification(s)");
        }
        info!("Notification aggregator stopped");
    }
}

/// Render a batch: grouped by change kind, then by destination
pub fn batch_message(batch: &[ChangeEvent], labels: &LibraryLabels) -> String {
    let mut message = format!("<b>📺 Media changes ({})</b>\n", batch.len());

    for kind in ChangeKind::ALL {
        let of_kind: Vec<&ChangeEvent> = batch.iter().filter(|c| c.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }

        let _ = writeln!(message, "{SEPARATOR}");
        let _ = writeln!(message, "{} <b>{}</b> ({})", kind.icon(), kind.label(), of_kind.len());

        for (destination, names) in group_by_destination(&of_kind) {
            let label = match destination {
                Some(d) => labels.label(d),
                None => "no rescan".to_string(),
            };
            let _ = writeln!(message, "🎞️ {}", escape_html(&label));
            for name in names.iter().take(MAX_NAMES_PER_GROUP) {
                let _ = writeln!(message, "  🍬 <code>{}</code>", display_name(name));
            }
            if names.len() > MAX_NAMES_PER_GROUP {
                let _ = writeln!(message, "  ...and {} more", names.len() - MAX_NAMES_PER_GROUP);
            }
        }
    }

    message.trim_end().to_string()
}

/// Destinations in order of first appearance with their file names
fn group_by_destination<'a>(
    changes: &[&'a ChangeEvent],
) -> Vec<(Option<&'a Destination>, Vec<String>)> {
    let mut groups: Vec<(Option<&'a Destination>, Vec<String>)> = Vec::new();
    for change in changes {
        let destination = change.destination.as_ref();
        match groups.iter_mut().find(|(d, _)| *d == destination) {
            Some((_, names)) => names.push(change.file_name()),
            None => groups.push((destination, vec![change.file_name()])),
        }
    }
    groups
}
