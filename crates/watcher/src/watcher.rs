//! notify bridge
//!
//! The OS callback only forwards into a bounded channel; a tokio task
//! translates each notification and hands it to the [`EventHandler`].

use crate::config::WatcherConfig;
use crate::events::{ChangeKind, RawEvent};
use crate::handler::EventHandler;
use mediawatch_core::error::{Error, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Recursive watcher over the configured roots
pub struct FileWatcher {
    config: Arc<WatcherConfig>,
    watcher: Option<RecommendedWatcher>,
    watched_paths: Arc<RwLock<Vec<PathBuf>>>,
    processor: Option<JoinHandle<()>>,
}

impl FileWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config: Arc::new(config),
            watcher: None,
            watched_paths: Arc::new(RwLock::new(Vec::new())),
            processor: None,
        }
    }

    /// Start watching every usable root, feeding `handler`
    ///
    /// Roots that are missing or not directories are skipped with an error
    /// log. Fails only when no root at all could be watched.
    pub async fn start(&mut self, roots: &[PathBuf], handler: EventHandler) -> Result<()> {
        if self.watcher.is_some() {
            return Err(Error::watcher("File watcher is already running"));
        }

        let usable: Vec<&PathBuf> = roots
            .iter()
            .filter(|root| {
                let ok = root.is_dir();
                if !ok {
                    error!(
                        "Watch root {} does not exist or is not a directory, skipping",
                        root.display()
                    );
                }
                ok
            })
            .collect();
        if usable.is_empty() {
            return Err(Error::watcher("None of the configured watch roots is a directory"));
        }

        let (notify_tx, notify_rx) = mpsc::channel(self.config.max_queue_size);
        let mut watcher = self.init_watcher_with_retry(notify_tx).await?;

        let mut watched = Vec::new();
        for root in usable {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!("Watching {} (recursive)", root.display());
                    watched.push(root.clone());
                }
                Err(e) => error!("Failed to watch {}: {e}", root.display()),
            }
        }
        if watched.is_empty() {
            return Err(Error::watcher("No watch root could be watched"));
        }

        self.processor = Some(Self::start_event_processor(notify_rx, handler));
        self.watcher = Some(watcher);
        *self.watched_paths.write().await = watched;
        Ok(())
    }

    /// Initialize notify watcher with retry logic
    async fn init_watcher_with_retry(
        &self,
        tx: mpsc::Sender<NotifyEvent>,
    ) -> Result<RecommendedWatcher> {
        let max_attempts = self.config.max_init_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match Self::create_notify_watcher(tx.clone()) {
                Ok(watcher) => {
                    debug!("File watcher initialized");
                    return Ok(watcher);
                }
                Err(e) if attempts < max_attempts => {
                    warn!("Failed to initialize watcher (attempt {attempts}/{max_attempts}): {e}");
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => {
                    error!("Failed to initialize watcher after {attempts} attempts");
                    return Err(Error::watcher(format!("Watcher initialization failed: {e}")));
                }
            }
        }
    }

    fn create_notify_watcher(tx: mpsc::Sender<NotifyEvent>) -> Result<RecommendedWatcher> {
        RecommendedWatcher::new(
            move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = tx.try_send(event) {
                        error!("Dropping filesystem event: {e}");
                    }
                }
                Err(e) => error!("Notify error: {e}"),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))
    }

    fn start_event_processor(
        mut notify_rx: mpsc::Receiver<NotifyEvent>,
        handler: EventHandler,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = notify_rx.recv().await {
                trace!("Received notify event: {event:?}");
                for raw in translate(&event) {
                    handler.handle(raw).await;
                }
            }
            debug!("Event processor stopped");
        })
    }

    /// Stop the OS watch and wait for queued events to be processed
    pub async fn stop(&mut self) -> Result<()> {
        // Dropping the watcher drops the channel sender, which ends the processor
        if self.watcher.take().is_some() {
            self.watched_paths.write().await.clear();
            info!("File watcher stopped");
        }
        if let Some(processor) = self.processor.take() {
            processor
                .await
                .map_err(|e| Error::watcher(format!("Event processor failed: {e}")))?;
        }
        Ok(())
    }

    /// Get currently watched paths
    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.read().await.clone()
    }

    /// Check if a path is inside a watched root
    pub async fn is_watching(&self, path: &Path) -> bool {
        self.watched_paths
            .read()
            .await
            .iter()
            .any(|p| path.starts_with(p))
    }
}

/// Map one notify event onto zero or more raw events
///
/// Renames reported as a single `Both` event are skipped: the inotify
/// backend also emits separate `From` and `To` events for them.
pub fn translate(event: &NotifyEvent) -> Vec<RawEvent> {
    let Some(path) = event.paths.first() else {
        return Vec::new();
    };

    let raw = match &event.kind {
        EventKind::Create(CreateKind::Folder) => RawEvent::directory(ChangeKind::Created, path),
        EventKind::Create(_) if path.is_dir() => RawEvent::directory(ChangeKind::Created, path),
        EventKind::Create(_) => RawEvent::file(ChangeKind::Created, path),
        EventKind::Remove(RemoveKind::Folder) => RawEvent::directory(ChangeKind::Deleted, path),
        EventKind::Remove(_) => RawEvent::file(ChangeKind::Deleted, path),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => RawEvent::file(ChangeKind::MovedFrom, path),
            RenameMode::To if path.is_dir() => RawEvent::directory(ChangeKind::MovedTo, path),
            RenameMode::To => RawEvent::file(ChangeKind::MovedTo, path),
            RenameMode::Both => return Vec::new(),
            _ if path.exists() => RawEvent::file(ChangeKind::MovedTo, path),
            _ => RawEvent::file(ChangeKind::MovedFrom, path),
        },
        _ => return Vec::new(),
    };
    vec![raw]
}
