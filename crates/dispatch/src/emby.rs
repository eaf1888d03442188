//! Emby library rescan client

use crate::error::DispatchError;
use crate::ScanDispatcher;
use async_trait::async_trait;
use mediawatch_core::config::{Config, EmbyConfig};
use mediawatch_core::error::Result;
use mediawatch_core::Destination;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const MEDIA_UPDATED_PATH: &str = "/emby/Library/Media/Updated";
const REFRESH_PATH: &str = "/emby/Library/Refresh";
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Body of `POST /emby/Library/Media/Updated`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MediaUpdatedRequest {
    updates: Vec<MediaUpdate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MediaUpdate {
    path: String,
    update_type: &'static str,
}

/// Sends rescan requests to an Emby server
///
/// A library rescan is reported as a path update so Emby only walks that
/// folder; the full scan uses the global refresh endpoint.
pub struct EmbyScanDispatcher {
    client: Client,
    base_url: String,
    api_key: String,
    /// Library id -> path of the library as the server sees it
    server_paths: HashMap<String, String>,
}

impl EmbyScanDispatcher {
    /// Create a dispatcher for an explicit library -> server path map
    pub fn new(config: &EmbyConfig, server_paths: HashMap<String, String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            server_paths,
        })
    }

    /// Create a dispatcher whose paths come from the configured watch roots
    ///
    /// When several roots share a library id, the first one wins.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut server_paths = HashMap::new();
        for root in &config.roots {
            server_paths
                .entry(root.library_id.clone())
                .or_insert_with(|| root.server_path());
        }
        info!(
            "Emby dispatcher targeting {} ({} libraries)",
            config.emby.server_url,
            server_paths.len()
        );
        Self::new(&config.emby, server_paths)
    }

    async fn scan_library(&self, library_id: &str) -> std::result::Result<(), DispatchError> {
        let path = self
            .server_paths
            .get(library_id)
            .ok_or_else(|| DispatchError::UnknownLibrary(library_id.to_string()))?;

        let request = MediaUpdatedRequest {
            updates: vec![MediaUpdate {
                path: path.clone(),
                update_type: "scan",
            }],
        };

        debug!("Requesting rescan of library {library_id} at {path}");
        let response = self
            .client
            .post(format!("{}{MEDIA_UPDATED_PATH}", self.base_url))
            .header(TOKEN_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(&e))?;

        Self::expect_no_content(response).await
    }

    async fn scan_everything(&self) -> std::result::Result<(), DispatchError> {
        debug!("Requesting full library refresh");
        let response = self
            .client
            .post(format!("{}{REFRESH_PATH}", self.base_url))
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(&e))?;

        Self::expect_no_content(response).await
    }

    async fn expect_no_content(
        response: reqwest::Response,
    ) -> std::result::Result<(), DispatchError> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ScanDispatcher for EmbyScanDispatcher {
    async fn request_scan(&self, destination: &Destination) -> Result<()> {
        let result = match destination {
            Destination::Library(id) => self.scan_library(id).await,
            Destination::FullScan => self.scan_everything().await,
        };

        if let Err(e) = &result {
            warn!("Emby rescan for {destination} failed: {e}");
        }
        result.map_err(Into::into)
    }
}
