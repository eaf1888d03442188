//! Wiring of the watch source, the scan scheduler and the notification
//! aggregator around one shared state

use crate::classifier::PathClassifier;
use crate::config::WatcherConfig;
use crate::handler::EventHandler;
use crate::ignore::IgnoreFilter;
use crate::notifications::NotificationAggregator;
use crate::scheduler::{CyclePhase, CycleScheduler};
use crate::state::{shared_state, SharedState};
use crate::watcher::FileWatcher;
use mediawatch_core::config::Config;
use mediawatch_core::error::{Error, Result};
use mediawatch_dispatch::{ChatNotifier, ScanDispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Timing and queue settings for one service instance
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub scan_interval: Duration,
    pub notification_window: Duration,
    pub watcher: WatcherConfig,
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan_interval: config.scan_interval(),
            notification_window: config.notification_window(),
            watcher: WatcherConfig::default(),
        }
    }
}

/// A running monitor
pub struct MonitorService {
    state: SharedState,
    watcher: FileWatcher,
    cancel: CancellationToken,
    scheduler_task: JoinHandle<()>,
    aggregator_task: JoinHandle<()>,
    phase: watch::Receiver<CyclePhase>,
}

impl MonitorService {
    /// Start watching and both timer loops
    pub async fn start(
        config: &Config,
        options: ServiceOptions,
        dispatcher: Arc<dyn ScanDispatcher>,
        notifier: Arc<dyn ChatNotifier>,
    ) -> Result<Self> {
        let labels = Arc::new(config.labels());
        let classifier = Arc::new(PathClassifier::from_config(config));
        let ignore = IgnoreFilter::from_patterns(&config.monitor.ignore_patterns)
            .map_err(|e| Error::config(format!("Invalid ignore pattern: {e}")))?;

        info!(
            "Starting media monitor: {}s scan cycle, {}s notification window",
            options.scan_interval.as_secs(),
            options.notification_window.as_secs()
        );
        for root in &config.roots {
            info!(
                "  {} -> {} ({})",
                root.path.display(),
                labels.name(&root.library_id),
                root.library_id
            );
        }

        let state = shared_state();
        let handler = EventHandler::new(classifier, ignore, Arc::clone(&labels), state.clone());

        let roots: Vec<PathBuf> = config.roots.iter().map(|r| r.path.clone()).collect();
        let mut watcher = FileWatcher::new(options.watcher);
        watcher.start(&roots, handler).await?;

        let cancel = CancellationToken::new();

        let scheduler = Arc::new(CycleScheduler::new(
            state.clone(),
            dispatcher,
            Arc::clone(&notifier),
            Arc::clone(&labels),
            options.scan_interval,
        ));
        let phase = scheduler.subscribe_phase();
        let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

        let aggregator = NotificationAggregator::new(
            state.clone(),
            notifier,
            labels,
            options.notification_window,
        );
        let aggregator_task = tokio::spawn(aggregator.run(cancel.clone()));

        info!("Media monitor started");
        Ok(Self {
            state,
            watcher,
            cancel,
            scheduler_task,
            aggregator_task,
            phase,
        })
    }

    /// Shared accumulators, mainly for inspection
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watcher.watched_paths().await
    }

    /// Stop the watch, then both loops, and wait for all of them
    ///
    /// A cycle in flight finishes its dispatches; no new cycle starts.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down media monitor");
        let watcher_result = self.watcher.stop().await;
        self.cancel.cancel();

        for (name, task) in [
            ("scan scheduler", self.scheduler_task),
            ("notification aggregator", self.aggregator_task),
        ] {
            if let Err(e) = task.await {
                error!("The {name} task failed: {e}");
            }
        }

        watcher_result?;
        info!("Media monitor stopped");
        Ok(())
    }
}
