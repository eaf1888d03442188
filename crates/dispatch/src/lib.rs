//! Downstream collaborators of the monitor
//!
//! This crate provides the two outbound seams the scan cycle and the
//! notification batch talk to: a media-server rescan dispatcher and a chat
//! notifier, plus their HTTP implementations.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use mediawatch_core::config::{Config, TelegramConfig};
use mediawatch_core::error::Result;
use mediawatch_core::Destination;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod emby;
pub mod error;
mod telegram;

pub use emby::EmbyScanDispatcher;
pub use error::DispatchError;
pub use telegram::TelegramNotifier;

/// Trait for media-server rescan dispatchers
///
/// One call is one delivery attempt; implementations do not retry.
#[async_trait]
pub trait ScanDispatcher: Send + Sync {
    /// Ask the server to rescan `destination`
    ///
    /// [`Destination::FullScan`] means "scan everything".
    async fn request_scan(&self, destination: &Destination) -> Result<()>;
}

/// Trait for chat notifiers
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Deliver one free-form message
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Notifier used when no chat is configured: every message is accepted and dropped
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl ChatNotifier for DisabledNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        debug!(
            "Chat notifications disabled, dropping {} byte message",
            text.len()
        );
        Ok(())
    }
}

/// Create the rescan dispatcher for the configured media server
pub fn create_scan_dispatcher(config: &Config) -> Result<Arc<dyn ScanDispatcher>> {
    let dispatcher = EmbyScanDispatcher::from_config(config)?;
    Ok(Arc::new(dispatcher))
}

/// Create the chat notifier
///
/// Falls back to [`DisabledNotifier`] when the bot token or chat id is missing.
pub fn create_chat_notifier(config: &TelegramConfig) -> Result<Arc<dyn ChatNotifier>> {
    if !config.is_configured() {
        warn!("Telegram bot not configured, chat notifications are disabled");
        return Ok(Arc::new(DisabledNotifier));
    }

    info!("Creating Telegram notifier");
    let notifier = TelegramNotifier::new(config)?;
    Ok(Arc::new(notifier))
}
