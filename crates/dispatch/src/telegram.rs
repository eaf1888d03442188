//! Telegram bot notifier

use crate::error::DispatchError;
use crate::ChatNotifier;
use async_trait::async_trait;
use mediawatch_core::config::TelegramConfig;
use mediawatch_core::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Request payload for `sendMessage`
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Delivers HTML-formatted messages to one Telegram chat
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier talking to the public Bot API
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Self::with_api_base(config, TELEGRAM_API_BASE)
    }

    /// Create a notifier against a different Bot API host (self-hosted bot API server)
    pub fn with_api_base(config: &TelegramConfig, api_base: &str) -> Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::config("telegram.bot_token is not set".to_string()))?;
        let chat_id = config
            .chat_id
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::config("telegram.chat_id is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_base, self.bot_token))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let err = DispatchError::from_reqwest(&e);
                warn!("Telegram request failed: {err}");
                Error::notification(err.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let err = DispatchError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            };
            warn!("Telegram rejected the message: {err}");
            return Err(Error::notification(err.to_string()));
        }

        info!("Telegram notification sent");
        Ok(())
    }
}
