//! Core types for the mediawatch library-rescan service
//!
//! This crate provides the foundational pieces shared by the other crates:
//!
//! - **Destinations**: concrete libraries and the full-scan sentinel
//! - **Configuration**: watch roots, timers, media server and chat settings
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod destination;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, EmbyConfig, MonitorConfig, RootConfig, TelegramConfig};
pub use destination::{Destination, LibraryLabels, FULL_SCAN_MARKER};
pub use error::{Error, Result, ResultExt};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::destination::Destination;
    pub use crate::error::{Result, ResultExt};
}
