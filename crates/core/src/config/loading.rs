//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;
use tracing::{debug, warn};

use super::defaults::*;
use super::{default_config_path, Config};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `MEDIAWATCH_` and use double underscores
    /// for nested values. For example:
    /// - `MEDIAWATCH_MONITOR__SCAN_INTERVAL_SECS=600`
    /// - `MEDIAWATCH_MONITOR__VIDEO_EXTENSIONS=mkv,mp4`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // The config crate doesn't apply serde defaults for missing sections
        let builder = set_config_default(
            builder,
            "monitor.scan_interval_secs",
            default_scan_interval_secs() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "monitor.notification_window_secs",
            default_notification_window_secs() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "monitor.video_extensions",
            default_video_extensions(),
        )?;
        let builder =
            set_config_default(builder, "monitor.ignore_patterns", default_ignore_patterns())?;
        let builder = set_config_default(builder, "monitor.lock_file", DEFAULT_LOCK_FILE)?;
        let builder = set_config_default(
            builder,
            "emby.timeout_secs",
            default_emby_timeout_secs() as i64,
        )?;
        let mut builder = set_config_default(
            builder,
            "telegram.timeout_secs",
            default_telegram_timeout_secs() as i64,
        )?;

        // Add the config file if it exists
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        } else {
            warn!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
        }

        // Add environment variables with MEDIAWATCH_ prefix
        builder = builder.add_source(
            Environment::with_prefix("MEDIAWATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("monitor.video_extensions")
                .with_list_parse_key("monitor.ignore_patterns")
                .try_parsing(true),
        );

        // Short names for the two secrets, handy in docker-compose files
        if let Ok(api_key) = std::env::var("EMBY_API_KEY") {
            builder = builder
                .set_override("emby.api_key", api_key)
                .map_err(|e| Error::config(format!("Failed to set EMBY_API_KEY: {e}")))?;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            builder = builder
                .set_override("telegram.bot_token", token)
                .map_err(|e| Error::config(format!("Failed to set TELEGRAM_BOT_TOKEN: {e}")))?;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            builder = builder
                .set_override("telegram.chat_id", chat_id)
                .map_err(|e| Error::config(format!("Failed to set TELEGRAM_CHAT_ID: {e}")))?;
        }

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (/etc/mediawatch/config.toml or custom --config path)
    /// 3. Environment variables (MEDIAWATCH_*, EMBY_API_KEY, TELEGRAM_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };
        Self::from_file(&path)
    }
}
