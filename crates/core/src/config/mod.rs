//! Configuration module for the mediawatch service
//!
//! Configuration is loaded once at startup from a TOML file and/or environment
//! variables and is immutable for the lifetime of the process.

mod defaults;
mod loading;


use crate::destination::LibraryLabels;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use defaults::*;

/// Returns the path of the system-wide configuration file
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Main configuration structure for the mediawatch service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Timers, file filtering and process guard
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Media server the rescans are sent to
    pub emby: EmbyConfig,

    /// Chat notifications (optional)
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Watched directory trees
    #[serde(default)]
    pub roots: Vec<RootConfig>,

    /// Library id -> display name
    #[serde(default)]
    pub library_names: HashMap<String, String>,
}

/// Timers and filtering for the monitor loop
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between two scan cycles
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Debounce window of the chat notification batch, in seconds
    #[serde(default = "default_notification_window_secs")]
    pub notification_window_secs: u64,

    /// Monitored file extensions, compared case-insensitively
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Glob patterns of paths that never produce events
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Lock file guarding against a second instance
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
}

impl MonitorConfig {
    /// Get the scan cycle interval
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Get the notification debounce window
    pub fn notification_window(&self) -> Duration {
        Duration::from_secs(self.notification_window_secs)
    }

    /// Monitored extensions, lowercased and without a leading dot
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.video_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            notification_window_secs: default_notification_window_secs(),
            video_extensions: default_video_extensions(),
            ignore_patterns: default_ignore_patterns(),
            lock_file: default_lock_file(),
        }
    }
}

/// Connection settings for the Emby server
#[derive(Clone, Deserialize)]
pub struct EmbyConfig {
    /// Base URL, e.g. `http://10.0.0.88:8096`
    pub server_url: String,

    /// API key sent as `X-Emby-Token` (or use EMBY_API_KEY env var)
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_emby_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmbyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbyConfig")
            .field("server_url", &self.server_url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Telegram bot settings
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (or use TELEGRAM_BOT_TOKEN env var)
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Target chat id (or use TELEGRAM_CHAT_ID env var)
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_telegram_timeout_secs")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    /// Both a token and a chat id are present and non-empty
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.bot_token) && present(&self.chat_id)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            timeout_secs: default_telegram_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field(
                "bot_token",
                &self.bot_token.as_ref().map(|_| "***REDACTED***"),
            )
            .field("chat_id", &self.chat_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// One watched directory tree and the library it feeds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RootConfig {
    /// Absolute host path
    pub path: PathBuf,

    /// Library id on the media server
    pub library_id: String,

    /// The same directory as the media server sees it (defaults to `path`)
    #[serde(default)]
    pub container_path: Option<String>,
}

impl RootConfig {
    /// Path to report to the media server for this root
    pub fn server_path(&self) -> String {
        self.container_path
            .clone()
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

impl Config {
    /// Scan cycle interval
    pub fn scan_interval(&self) -> Duration {
        self.monitor.scan_interval()
    }

    /// Notification debounce window
    pub fn notification_window(&self) -> Duration {
        self.monitor.notification_window()
    }

    /// Display names for the configured libraries
    pub fn labels(&self) -> LibraryLabels {
        LibraryLabels::new(self.library_names.clone())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::config(
                "At least one [[roots]] entry is required".to_string(),
            ));
        }

        for root in &self.roots {
            if !root.path.is_absolute() {
                return Err(Error::config(format!(
                    "Watch root {} must be an absolute path",
                    root.path.display()
                )));
            }
            if root.library_id.trim().is_empty() {
                return Err(Error::config(format!(
                    "Watch root {} has an empty library_id",
                    root.path.display()
                )));
            }
        }

        if self.monitor.scan_interval_secs == 0 {
            return Err(Error::config(
                "monitor.scan_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.monitor.notification_window_secs == 0 {
            return Err(Error::config(
                "monitor.notification_window_secs must be greater than 0".to_string(),
            ));
        }
        if self.monitor.notification_window_secs >= self.monitor.scan_interval_secs {
            return Err(Error::config(format!(
                "monitor.notification_window_secs ({}) must be shorter than scan_interval_secs ({})",
                self.monitor.notification_window_secs, self.monitor.scan_interval_secs
            )));
        }

        if self.monitor.normalized_extensions().is_empty() {
            return Err(Error::config(
                "monitor.video_extensions must not be empty".to_string(),
            ));
        }

        for pattern in &self.monitor.ignore_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::config(format!("Invalid ignore pattern '{pattern}': {e}"))
            })?;
        }

        if self.emby.server_url.trim().is_empty() {
            return Err(Error::config("emby.server_url must be set".to_string()));
        }
        if self.emby.api_key.trim().is_empty() {
            return Err(Error::config(
                "emby.api_key must be set (or EMBY_API_KEY)".to_string(),
            ));
        }
        if self.emby.timeout_secs == 0 {
            return Err(Error::config(
                "emby.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
