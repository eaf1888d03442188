//! Fixed-interval scan cycles
//!
//! Once per interval the scheduler drains the pending changes and scan
//! requests under the shared lock, releases it, resolves which rescans to
//! issue, dispatches them concurrently and reports the cycle to the chat.
//!
//! ```text
//! Idle --tick--> Draining --(nothing pending)--> Idle
//!                   |
//!                   +--> Dispatching --> Idle
//! ```

use crate::events::{ChangeEvent, ChangeKind};
use crate::markup::{escape_html, SEPARATOR};
use crate::state::SharedState;
use futures::future::join_all;
use mediawatch_core::{Destination, LibraryLabels};
use mediawatch_dispatch::{ChatNotifier, ScanDispatcher};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting for the next tick
    Idle,
    /// Holding the lock while taking the pending state
    Draining,
    /// Talking to the media server, lock released
    Dispatching,
}

/// Rescans resolved from one drained request set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Changes were recorded but none asked for a rescan
    Nothing,
    /// The full scan covers every library; nothing else is sent
    FullScan,
    /// One rescan per library, sorted by id
    Libraries(Vec<String>),
}

impl ScanPlan {
    pub fn destinations(&self) -> Vec<Destination> {
        match self {
            Self::Nothing => Vec::new(),
            Self::FullScan => vec![Destination::FullScan],
            Self::Libraries(ids) => ids.iter().cloned().map(Destination::Library).collect(),
        }
    }
}

/// Apply the priority rule: a pending full scan suppresses every library scan
pub fn resolve_scan_plan(requests: &HashSet<Destination>) -> ScanPlan {
    if requests.contains(&Destination::FullScan) {
        return ScanPlan::FullScan;
    }
    let mut ids: Vec<String> = requests
        .iter()
        .filter_map(|d| d.library_id().map(str::to_string))
        .collect();
    if ids.is_empty() {
        return ScanPlan::Nothing;
    }
    ids.sort();
    ScanPlan::Libraries(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub destination: Destination,
    pub succeeded: bool,
}

#[derive(Debug)]
pub struct CycleReport {
    pub changes: Vec<ChangeEvent>,
    pub plan: ScanPlan,
    pub dispatched: Vec<DispatchResult>,
    pub summary_sent: bool,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.dispatched.iter().filter(|r| !r.succeeded).count()
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was pending
    Idle,
    Completed(CycleReport),
}

pub struct CycleScheduler {
    state: SharedState,
    dispatcher: Arc<dyn ScanDispatcher>,
    notifier: Arc<dyn ChatNotifier>,
    labels: Arc<LibraryLabels>,
    interval: Duration,
    phase: watch::Sender<CyclePhase>,
}

impl CycleScheduler {
    pub fn new(
        state: SharedState,
        dispatcher: Arc<dyn ScanDispatcher>,
        notifier: Arc<dyn ChatNotifier>,
        labels: Arc<LibraryLabels>,
        interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            state,
            dispatcher,
            notifier,
            labels,
            interval,
            phase,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    /// Run one cycle: drain, resolve, dispatch, report
    pub async fn run_cycle(&self) -> CycleOutcome {
        let snapshot = {
            let mut state = self.state.lock().await;
            self.phase.send_replace(CyclePhase::Draining);
            state.drain_cycle()
        };

        if snapshot.is_empty() {
            info!("No media changes in this cycle");
            self.phase.send_replace(CyclePhase::Idle);
            return CycleOutcome::Idle;
        }

        self.phase.send_replace(CyclePhase::Dispatching);
        let plan = resolve_scan_plan(&snapshot.scans);
        info!(
            "Cycle drained {} change(s), {} scan request(s)",
            snapshot.changes.len(),
            snapshot.scans.len()
        );
        if plan == ScanPlan::FullScan && snapshot.scans.len() > 1 {
            info!(
                "Full library scan requested, suppressing {} library scan(s)",
                snapshot.scans.len() - 1
            );
        }

        let dispatched = self.dispatch(&plan).await;

        let message = cycle_report_message(
            &snapshot.changes,
            &dispatched,
            &plan,
            self.interval,
            &self.labels,
        );
        let summary_sent = match self.notifier.send_message(&message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send cycle report: {e}");
                false
            }
        };

        self.phase.send_replace(CyclePhase::Idle);
        CycleOutcome::Completed(CycleReport {
            changes: snapshot.changes,
            plan,
            dispatched,
            summary_sent,
        })
    }

    /// One dispatch per destination, concurrently; failures are logged and
    /// neither retried nor re-queued
    async fn dispatch(&self, plan: &ScanPlan) -> Vec<DispatchResult> {
        let destinations = plan.destinations();
        let attempts = destinations.iter().map(|destination| async move {
            let label = self.labels.label(destination);
            match self.dispatcher.request_scan(destination).await {
                Ok(()) => {
                    info!("Rescan of {label} started");
                    true
                }
                Err(e) => {
                    error!("Rescan of {label} failed: {e}");
                    false
                }
            }
        });

        let outcomes = join_all(attempts).await;
        destinations
            .into_iter()
            .zip(outcomes)
            .map(|(destination, succeeded)| DispatchResult {
                destination,
                succeeded,
            })
            .collect()
    }

    /// Run a cycle in its own task so a panic ends only that cycle
    pub async fn run_guarded_cycle(self: &Arc<Self>) -> Option<CycleOutcome> {
        let scheduler = Arc::clone(self);
        match tokio::spawn(async move { scheduler.run_cycle().await }).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Scan cycle aborted: {e}");
                self.phase.send_replace(CyclePhase::Idle);
                None
            }
        }
    }

    /// Tick every interval until cancelled
    ///
    /// The first cycle runs one interval after start. A cycle already in
    /// flight when cancellation arrives is allowed to finish.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Scan scheduler started ({:?} interval)", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(CycleOutcome::Completed(report)) = self.run_guarded_cycle().await {
                        debug!(
                            "Cycle complete: {} dispatch(es), {} failed",
                            report.dispatched.len(),
                            report.failures()
                        );
                    }
                }
            }
        }

        info!("Scan scheduler stopped");
    }
}

/// Render the end-of-cycle report
pub fn cycle_report_message(
    changes: &[ChangeEvent],
    dispatched: &[DispatchResult],
    plan: &ScanPlan,
    interval: Duration,
    labels: &LibraryLabels,
) -> String {
    let mut message = String::from("<b>⭐️ Media monitor report</b>\n\n");
    let _ = writeln!(message, "🕒 Cycle: {}s", interval.as_secs());
    let _ = writeln!(message, "🔖 Changes: {}", changes.len());
    for kind in ChangeKind::ALL {
        let count = changes.iter().filter(|c| c.kind == kind).count();
        if count > 0 {
            let _ = writeln!(message, "{} {}: {count}", kind.icon(), kind.label());
        }
    }
    let _ = writeln!(message, "{SEPARATOR}");
    let _ = writeln!(message, "🎬 Emby actions:");

    match plan {
        ScanPlan::Nothing => {
            let _ = writeln!(message, "⚪️ no rescan triggered (changes recorded only)");
        }
        ScanPlan::FullScan | ScanPlan::Libraries(_) => {
            for result in dispatched {
                let name = escape_html(&labels.label(&result.destination));
                let line = match (&result.destination, result.succeeded) {
                    (Destination::FullScan, true) => "🟢 full library scan triggered".to_string(),
                    (Destination::FullScan, false) => "🔴 full library scan failed".to_string(),
                    (Destination::Library(_), true) => format!("🟢 rescanned {name}"),
                    (Destination::Library(_), false) => format!("🔴 rescan of {name} failed"),
                };
                let _ = writeln!(message, "{line}");
            }
        }
    }

    message.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{PathClassifier, WatchRoot};
    use crate::events::RawEvent;
    use crate::handler::EventHandler;
    use crate::ignore::IgnoreFilter;
    use crate::state::shared_state;
    use crate::test_support::{RecordingDispatcher, RecordingNotifier};
    use std::sync::atomic::{AtomicBool, Ordering};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn scheduler(
        dispatcher: RecordingDispatcher,
    ) -> (
        Arc<CycleScheduler>,
        SharedState,
        Arc<RecordingDispatcher>,
        Arc<RecordingNotifier>,
    ) {
        let state = shared_state();
        let dispatcher = Arc::new(dispatcher);
        let notifier = Arc::new(RecordingNotifier::default());
        let labels = LibraryLabels::new(HashMap::from([
            ("M".to_string(), "Movies".to_string()),
            ("T".to_string(), "TV".to_string()),
        ]));
        let scheduler = CycleScheduler::new(
            state.clone(),
            dispatcher.clone(),
            notifier.clone(),
            Arc::new(labels),
            Duration::from_secs(300),
        );
        (Arc::new(scheduler), state, dispatcher, notifier)
    }

    async fn enqueue(state: &SharedState, path: &str, destination: Destination) {
        let mut state = state.lock().await;
        state.changes.record(ChangeEvent::scanned(
            path,
            ChangeKind::Created,
            destination.clone(),
        ));
        state.scans.add(destination);
    }

    fn completed(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Completed(report) => report,
            CycleOutcome::Idle => panic!("expected a completed cycle"),
        }
    }

    #[test]
    fn test_full_scan_suppresses_libraries() {
        let requests = HashSet::from([
            Destination::library("M"),
            Destination::FullScan,
            Destination::library("T"),
        ]);
        assert_eq!(resolve_scan_plan(&requests), ScanPlan::FullScan);
        assert_eq!(
            resolve_scan_plan(&HashSet::from([Destination::library("T"), Destination::library("M")])),
            ScanPlan::Libraries(vec!["M".to_string(), "T".to_string()])
        );
        assert_eq!(resolve_scan_plan(&HashSet::new()), ScanPlan::Nothing);
    }

    #[tokio::test]
    async fn test_empty_cycle_is_a_noop() {
        let (scheduler, _state, dispatcher, notifier) = scheduler(RecordingDispatcher::default());

        assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Idle));
        assert!(dispatcher.calls().is_empty());
        assert!(notifier.attempts().is_empty());
        assert_eq!(scheduler.phase(), CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_full_scan_is_the_only_dispatch() {
        let (scheduler, state, dispatcher, notifier) = scheduler(RecordingDispatcher::default());
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;
        enqueue(&state, "/media/tv/b.mkv", Destination::library("T")).await;
        enqueue(&state, "/srv/c.mkv", Destination::FullScan).await;

        let report = completed(scheduler.run_cycle().await);

        assert_eq!(dispatcher.calls(), vec![Destination::FullScan]);
        assert_eq!(report.plan, ScanPlan::FullScan);
        assert_eq!(report.changes.len(), 3);
        assert!(report.summary_sent);
        assert!(notifier.delivered()[0].contains("full library scan triggered"));
    }

    #[tokio::test]
    async fn test_one_failing_library_does_not_block_others() {
        let (scheduler, state, dispatcher, notifier) =
            scheduler(RecordingDispatcher::failing([Destination::library("M")]));
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;
        enqueue(&state, "/media/tv/b.mkv", Destination::library("T")).await;

        let report = completed(scheduler.run_cycle().await);

        let calls: HashSet<_> = dispatcher.calls().into_iter().collect();
        assert_eq!(
            calls,
            HashSet::from([Destination::library("M"), Destination::library("T")])
        );
        assert_eq!(report.failures(), 1);

        let summary = &notifier.delivered()[0];
        assert!(summary.contains("🔴 rescan of Movies failed"));
        assert!(summary.contains("🟢 rescanned TV"));
    }

    #[tokio::test]
    async fn test_failed_destination_is_not_requeued() {
        let (scheduler, state, dispatcher, _notifier) =
            scheduler(RecordingDispatcher::failing([Destination::library("M")]));
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;

        completed(scheduler.run_cycle().await);
        assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Idle));
        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_no_change_belongs_to_two_cycles() {
        let (scheduler, state, _dispatcher, _notifier) = scheduler(RecordingDispatcher::default());
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;

        let first = completed(scheduler.run_cycle().await);
        enqueue(&state, "/media/movies/b.mkv", Destination::library("M")).await;
        let second = completed(scheduler.run_cycle().await);

        assert_eq!(first.changes.len(), 1);
        assert_eq!(second.changes.len(), 1);
        assert_ne!(first.changes[0].path, second.changes[0].path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_are_drained_exactly_once() {
        const TASKS: usize = 8;
        const EVENTS_PER_TASK: usize = 50;

        let (scheduler, state, _dispatcher, _notifier) = scheduler(RecordingDispatcher::default());
        let classifier = PathClassifier::new(
            vec![
                WatchRoot::new("/media/movies", "M"),
                WatchRoot::new("/media/tv", "T"),
            ],
            &["mkv"],
        );
        let handler = Arc::new(EventHandler::new(
            Arc::new(classifier),
            IgnoreFilter::new(),
            Arc::new(LibraryLabels::default()),
            state.clone(),
        ));

        let producers_done = Arc::new(AtomicBool::new(false));
        let drainer = {
            let scheduler = scheduler.clone();
            let producers_done = producers_done.clone();
            tokio::spawn(async move {
                let mut drained = Vec::new();
                while !producers_done.load(Ordering::SeqCst) {
                    if let CycleOutcome::Completed(report) = scheduler.run_cycle().await {
                        drained.extend(report.changes);
                    }
                    tokio::task::yield_now().await;
                }
                drained
            })
        };

        let producers: Vec<_> = (0..TASKS)
            .map(|task| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let root = if task % 2 == 0 { "movies" } else { "tv" };
                    for i in 0..EVENTS_PER_TASK {
                        let path = format!("/media/{root}/task{task}/file{i}.mkv");
                        handler
                            .handle(RawEvent::file(ChangeKind::Created, path))
                            .await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        producers_done.store(true, Ordering::SeqCst);

        let mut drained = drainer.await.unwrap();
        if let CycleOutcome::Completed(report) = scheduler.run_cycle().await {
            drained.extend(report.changes);
        }

        let unique: HashSet<_> = drained.iter().map(|change| change.path.clone()).collect();
        assert_eq!(drained.len(), TASKS * EVENTS_PER_TASK);
        assert_eq!(unique.len(), TASKS * EVENTS_PER_TASK);
        assert!(state.lock().await.changes.is_empty());
    }

    #[tokio::test]
    async fn test_phase_stays_idle_until_state_lock_is_held() {
        let (scheduler, state, _dispatcher, _notifier) = scheduler(RecordingDispatcher::default());
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;

        let guard = state.lock().await;
        let cycle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run_cycle().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(scheduler.phase(), CyclePhase::Idle);

        drop(guard);
        completed(cycle.await.unwrap());
        assert_eq!(scheduler.phase(), CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_deletions_only_report_without_rescan() {
        let (scheduler, state, dispatcher, notifier) = scheduler(RecordingDispatcher::default());
        state
            .lock()
            .await
            .changes
            .record(ChangeEvent::unscanned("/media/movies/a.mkv", ChangeKind::Deleted));

        let report = completed(scheduler.run_cycle().await);

        assert_eq!(report.plan, ScanPlan::Nothing);
        assert!(dispatcher.calls().is_empty());
        let summary = &notifier.delivered()[0];
        assert!(summary.contains("🔴 Deleted: 1"));
        assert!(summary.contains("no rescan triggered (changes recorded only)"));
    }

    #[tokio::test]
    async fn test_report_failure_does_not_fail_cycle() {
        let (scheduler, state, dispatcher, notifier) = scheduler(RecordingDispatcher::default());
        notifier.set_failing(true);
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;

        let report = completed(scheduler.run_cycle().await);
        assert!(!report.summary_sent);
        assert_eq!(dispatcher.calls(), vec![Destination::library("M")]);
    }

    #[tokio::test]
    async fn test_panicking_cycle_is_contained() {
        let (scheduler, state, _dispatcher, _notifier) = scheduler(RecordingDispatcher::panicking());
        enqueue(&state, "/media/movies/a.mkv", Destination::library("M")).await;

        assert!(scheduler.run_guarded_cycle().await.is_none());
        assert_eq!(scheduler.phase(), CyclePhase::Idle);

        // The drained state is gone; the next cycle starts clean
        assert!(matches!(
            scheduler.run_guarded_cycle().await,
            Some(CycleOutcome::Idle)
        ));
    }

    #[test]
    fn test_cycle_report_layout() {
        let changes = vec![
            ChangeEvent::scanned("/m/a.mkv", ChangeKind::Created, Destination::library("M")),
            ChangeEvent::scanned("/m/b.mkv", ChangeKind::Created, Destination::library("M")),
            ChangeEvent::unscanned("/m/c.mkv", ChangeKind::Deleted),
        ];
        let dispatched = vec![DispatchResult {
            destination: Destination::library("M"),
            succeeded: true,
        }];
        let labels = LibraryLabels::new(HashMap::from([("M".to_string(), "Movies".to_string())]));

        let message = cycle_report_message(
            &changes,
            &dispatched,
            &ScanPlan::Libraries(vec!["M".to_string()]),
            Duration::from_secs(300),
            &labels,
        );

        let expected = "\
<b>⭐️ Media monitor report</b>

🕒 Cycle: 300s
🔖 Changes: 3
🟢 Created: 2
🔴 Deleted: 1
—————————
🎬 Emby actions:
🟢 rescanned Movies";
        assert_eq!(message, expected);
    }
}
