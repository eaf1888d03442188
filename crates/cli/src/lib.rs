//! Library interface for the mediawatch CLI
//!
//! This module exposes internal functions for integration testing while keeping
//! the main binary logic in main.rs.

pub mod instance_lock;

pub use instance_lock::InstanceLock;

use anyhow::{Context, Result};
use mediawatch_core::config::Config;
use std::fmt::Write as _;
use std::path::Path;

/// Load and validate the configuration
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Human-readable summary of a loaded configuration, secrets left out
pub fn describe_config(config: &Config) -> String {
    let labels = config.labels();
    let mut out = String::new();

    let _ = writeln!(out, "Emby server:        {}", config.emby.server_url);
    let _ = writeln!(
        out,
        "Telegram:           {}",
        if config.telegram.is_configured() {
            "enabled"
        } else {
            "disabled"
        }
    );
    let _ = writeln!(out, "Scan interval:      {}s", config.monitor.scan_interval_secs);
    let _ = writeln!(
        out,
        "Notification window: {}s",
        config.monitor.notification_window_secs
    );
    let _ = writeln!(
        out,
        "Video extensions:   {}",
        config.monitor.normalized_extensions().join(", ")
    );
    let _ = writeln!(out, "Watch roots:");
    for root in &config.roots {
        let status = if root.path.is_dir() { "" } else { "  [missing]" };
        let _ = writeln!(
            out,
            "  {} -> {} ({}) as {}{status}",
            root.path.display(),
            labels.name(&root.library_id),
            root.library_id,
            root.server_path()
        );
    }
    out
}
