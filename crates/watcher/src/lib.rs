#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Event aggregation and rescan dispatch for watched media folders
//!
//! This crate turns raw filesystem notifications into:
//! - a per-cycle list of changes and a deduplicated set of library rescans,
//!   drained on a fixed interval by the [`CycleScheduler`]
//! - a chat notification batch, flushed on its own shorter window by the
//!   [`NotificationAggregator`]
//!
//! All three accumulators live behind one lock ([`SharedState`]).
//!
//! # Example
//!
//! ```no_run
//! use mediawatch_core::Config;
//! use mediawatch_watcher::{MonitorService, ServiceOptions};
//!
//! # async fn example(config: Config) -> mediawatch_core::Result<()> {
//! let dispatcher = mediawatch_dispatch::create_scan_dispatcher(&config)?;
//! let notifier = mediawatch_dispatch::create_chat_notifier(&config.telegram)?;
//!
//! let service = MonitorService::start(
//!     &config,
//!     ServiceOptions::from_config(&config),
//!     dispatcher,
//!     notifier,
//! )
//! .await?;
//!
//! tokio::signal::ctrl_c().await?;
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod classifier;
mod config;
mod events;
mod handler;
mod ignore;
mod markup;
mod notifications;
mod scheduler;
mod service;
mod state;
mod watcher;

#[cfg(test)]
mod test_support;

pub use classifier::{Classification, PathClassifier, WatchRoot};
pub use config::{WatcherConfig, WatcherConfigBuilder};
pub use events::{ChangeEvent, ChangeKind, RawEvent};
pub use handler::{EventHandler, HandleOutcome};
pub use ignore::IgnoreFilter;
pub use notifications::{batch_message, FlushOutcome, NotificationAggregator};
pub use scheduler::{
    cycle_report_message, resolve_scan_plan, CycleOutcome, CyclePhase, CycleReport,
    CycleScheduler, DispatchResult, ScanPlan,
};
pub use service::{MonitorService, ServiceOptions};
pub use state::{
    shared_state, Accumulators, ChangeRecorder, CycleSnapshot, NotificationBatch,
    ScanRequestSet, SharedState,
};
pub use watcher::{translate, FileWatcher};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events::{ChangeEvent, ChangeKind};
    pub use crate::service::{MonitorService, ServiceOptions};
    pub use crate::watcher::FileWatcher;
}
