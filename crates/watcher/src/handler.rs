//! Bridge from raw filesystem notifications to the shared accumulators

use crate::classifier::PathClassifier;
use crate::events::{ChangeEvent, ChangeKind, RawEvent};
use crate::ignore::IgnoreFilter;
use crate::state::SharedState;
use mediawatch_core::{Destination, LibraryLabels};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to one raw notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Directory events are not tracked
    Directory,
    /// Matched an ignore pattern
    Ignored,
    /// Not a monitored media file
    NotMedia,
    /// Recorded, queued for a rescan of the destination and for chat
    Queued(Destination),
    /// Recorded without a rescan (deletions)
    RecordedOnly,
}

/// Classifies raw events and records them
///
/// Cheap to clone; all clones feed the same shared state.
#[derive(Clone)]
pub struct EventHandler {
    classifier: Arc<PathClassifier>,
    ignore: IgnoreFilter,
    labels: Arc<LibraryLabels>,
    state: SharedState,
}

impl EventHandler {
    pub fn new(
        classifier: Arc<PathClassifier>,
        ignore: IgnoreFilter,
        labels: Arc<LibraryLabels>,
        state: SharedState,
    ) -> Self {
        Self {
            classifier,
            ignore,
            labels,
            state,
        }
    }

    pub async fn handle(&self, event: RawEvent) -> HandleOutcome {
        if event.is_directory {
            return HandleOutcome::Directory;
        }
        if self.ignore.should_ignore(&event.path) {
            return HandleOutcome::Ignored;
        }

        match event.kind {
            ChangeKind::Deleted => self.record_deletion(&event.path).await,
            kind => self.record_change(&event.path, kind).await,
        }
    }

    /// A rename is two independent records: the source and the target
    pub async fn handle_move(&self, from: &Path, to: &Path) -> (HandleOutcome, HandleOutcome) {
        info!("File moved: {} -> {}", from.display(), to.display());
        let source = self.handle(RawEvent::file(ChangeKind::MovedFrom, from)).await;
        let target = self.handle(RawEvent::file(ChangeKind::MovedTo, to)).await;
        (source, target)
    }

    async fn record_deletion(&self, path: &Path) -> HandleOutcome {
        info!("File deleted (no rescan): {}", path.display());
        let mut state = self.state.lock().await;
        state
            .changes
            .record(ChangeEvent::unscanned(path, ChangeKind::Deleted));
        HandleOutcome::RecordedOnly
    }

    async fn record_change(&self, path: &Path, kind: ChangeKind) -> HandleOutcome {
        let classification = self.classifier.classify(path);
        if !classification.is_media_file {
            debug!("Ignoring non-media change ({kind:?}): {}", path.display());
            return HandleOutcome::NotMedia;
        }

        let destination = match classification.library_id {
            Some(id) => Destination::Library(id),
            None => Destination::FullScan,
        };
        let change = ChangeEvent::scanned(path, kind, destination.clone());

        let newly_queued = {
            let mut state = self.state.lock().await;
            state.changes.record(change.clone());
            state.notifications.push(change);
            state.scans.add(destination.clone())
        };

        match &destination {
            Destination::Library(_) => info!(
                "{} {}: queued rescan of {}{}",
                kind.label(),
                path.display(),
                self.labels.label(&destination),
                if newly_queued { "" } else { " (already pending)" }
            ),
            Destination::FullScan => info!(
                "{} {}: no watch root matches, queued full library scan",
                kind.label(),
                path.display()
            ),
        }

        HandleOutcome::Queued(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::WatchRoot;
    use crate::state::shared_state;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn handler() -> (EventHandler, SharedState) {
        let classifier = PathClassifier::new(
            vec![
                WatchRoot::new("/media/movies", "M"),
                WatchRoot::new("/media/tv", "T"),
            ],
            &["mkv", "mp4"],
        );
        let state = shared_state();
        let ignore = IgnoreFilter::from_patterns(&["*/@eaDir/*"]).unwrap();
        let handler = EventHandler::new(
            Arc::new(classifier),
            ignore,
            Arc::new(LibraryLabels::default()),
            state.clone(),
        );
        (handler, state)
    }

    #[tokio::test]
    async fn test_two_creations_and_a_deletion() {
        let (handler, state) = handler();

        handler
            .handle(RawEvent::file(ChangeKind::Created, "/media/movies/a.mkv"))
            .await;
        handler
            .handle(RawEvent::file(ChangeKind::Created, "/media/movies/b.mp4"))
            .await;
        handler
            .handle(RawEvent::file(ChangeKind::Deleted, "/media/movies/c.mkv"))
            .await;

        let mut state = state.lock().await;
        assert_eq!(state.notifications.len(), 2);
        let snapshot = state.drain_cycle();
        assert_eq!(snapshot.scans, HashSet::from([Destination::library("M")]));
        assert_eq!(snapshot.changes.len(), 3);
        assert_eq!(snapshot.changes[2].kind, ChangeKind::Deleted);
        assert_eq!(snapshot.changes[2].destination, None);
    }

    #[tokio::test]
    async fn test_deletions_never_scan_or_notify() {
        let (handler, state) = handler();

        for path in ["/media/movies/a.mkv", "/srv/elsewhere/b.mkv", "/media/tv/c.txt"] {
            let outcome = handler.handle(RawEvent::file(ChangeKind::Deleted, path)).await;
            assert_eq!(outcome, HandleOutcome::RecordedOnly);
        }

        let state = state.lock().await;
        assert_eq!(state.changes.len(), 3);
        assert!(state.scans.is_empty());
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_rename_across_libraries() {
        let (handler, state) = handler();

        let (source, target) = handler
            .handle_move(
                Path::new("/media/movies/show.mkv"),
                Path::new("/media/tv/show.mkv"),
            )
            .await;
        assert_eq!(source, HandleOutcome::Queued(Destination::library("M")));
        assert_eq!(target, HandleOutcome::Queued(Destination::library("T")));

        let state = state.lock().await;
        assert_eq!(state.scans.len(), 2);
        let kinds: Vec<_> = state.notifications.entries().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::MovedFrom, ChangeKind::MovedTo]);
    }

    #[tokio::test]
    async fn test_unknown_root_escalates_to_full_scan() {
        let (handler, state) = handler();

        let outcome = handler
            .handle(RawEvent::file(ChangeKind::Created, "/srv/downloads/a.mkv"))
            .await;
        assert_eq!(outcome, HandleOutcome::Queued(Destination::FullScan));
        assert!(state.lock().await.scans.contains(&Destination::FullScan));
    }

    #[tokio::test]
    async fn test_dropped_events_leave_state_untouched() {
        let (handler, state) = handler();

        assert_eq!(
            handler
                .handle(RawEvent::directory(ChangeKind::Created, "/media/movies/New"))
                .await,
            HandleOutcome::Directory
        );
        assert_eq!(
            handler
                .handle(RawEvent::file(ChangeKind::Created, "/media/movies/a.nfo"))
                .await,
            HandleOutcome::NotMedia
        );
        assert_eq!(
            handler
                .handle(RawEvent::file(
                    ChangeKind::Created,
                    "/media/movies/@eaDir/a.mkv"
                ))
                .await,
            HandleOutcome::Ignored
        );

        let state = state.lock().await;
        assert!(state.changes.is_empty());
        assert!(state.scans.is_empty());
        assert!(state.notifications.is_empty());
    }
}
