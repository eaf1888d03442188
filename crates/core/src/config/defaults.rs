//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/mediawatch/config.toml";
pub(crate) const DEFAULT_LOCK_FILE: &str = "/tmp/mediawatch.lock";

pub(crate) fn default_scan_interval_secs() -> u64 {
    300
}

pub(crate) fn default_notification_window_secs() -> u64 {
    5
}

pub(crate) fn default_video_extensions() -> Vec<String> {
    [
        "mp4", "mkv", "avi", "mov", "wmv", "mpg", "mpeg", "flv", "webm", "ts", "rmvb", "iso",
        "vob",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

/// Synology thumbnail and recycle-bin folders churn constantly and never hold library media.
pub(crate) fn default_ignore_patterns() -> Vec<String> {
    vec!["*/@eaDir/*".to_string(), "*/#recycle/*".to_string()]
}

pub(crate) fn default_lock_file() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_LOCK_FILE)
}

pub(crate) fn default_emby_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_telegram_timeout_secs() -> u64 {
    10
}
