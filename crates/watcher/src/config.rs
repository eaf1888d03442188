//! Configuration for the filesystem watch source

use std::time::Duration;

/// Immutable configuration for the notify bridge
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Maximum number of raw notifications buffered between the OS callback
    /// and the event processor (default: 10000)
    pub max_queue_size: usize,
    /// Attempts at creating the OS watcher before giving up (default: 3)
    pub max_init_retries: u32,
    /// Delay between those attempts in milliseconds (default: 1000ms)
    pub retry_delay_ms: u64,
}

impl WatcherConfig {
    /// Create configuration from builder
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Get the retry delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
            max_init_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Builder for WatcherConfig
#[derive(Debug, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    /// Set maximum queue size
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    /// Set the number of initialisation attempts
    pub fn max_init_retries(mut self, retries: u32) -> Self {
        self.config.max_init_retries = retries;
        self
    }

    /// Set retry delay in milliseconds
    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WatcherConfig {
        self.config
    }
}
