//! HTTP telemetry source for the intervals.icu activity API.
//!
//! This module provides the remote implementation of [`TelemetrySource`]:
//! - Connection pooling for HTTP/2 multiplexing
//! - Typed JSON decoding at the boundary
//! - Automatic retry with exponential backoff on 429
//!
//! Other transport failures are reported immediately so the batch layer's
//! per-item failure semantics stay visible to callers.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use log::{debug, warn};
use reqwest::Client;

use crate::error::{Result, SyncError};
use crate::telemetry::{RawTrack, TelemetrySource};

const DEFAULT_BASE_URL: &str = "https://intervals.icu/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_MAX_IDLE_PER_HOST: usize = 10;
const MAX_RETRIES: u32 = 3;

/// Remote telemetry source over HTTPS.
pub struct RemoteTelemetrySource {
    client: Client,
    base_url: String,
}

impl RemoteTelemetrySource {
    /// Create a source against the production API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a source against a custom base URL (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build a Basic authorization header from an API key.
    ///
    /// Pre-formatted `Basic ...` / `Bearer ...` values pass through the
    /// credential parameter untouched; this helper covers the API-key
    /// flow.
    pub fn basic_auth_header(api_key: &str) -> String {
        let auth = base64::engine::general_purpose::STANDARD.encode(format!("API_KEY:{}", api_key));
        format!("Basic {}", auth)
    }
}

#[async_trait]
impl TelemetrySource for RemoteTelemetrySource {
    async fn fetch_track(&self, credential: &str, activity_id: &str) -> Result<RawTrack> {
        let url = format!("{}/activity/{}/map", self.base_url, activity_id);
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .header("Authorization", credential)
                .send()
                .await
                .map_err(|e| SyncError::HttpError {
                    message: format!("Request error: {}", e),
                    status_code: None,
                })?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(SyncError::HttpError {
                        message: "Max retries exceeded (429)".to_string(),
                        status_code: Some(429),
                    });
                }

                // Exponential backoff: 1s, 2s, 4s
                let backoff = Duration::from_millis(500 * (1 << retries.min(3)));
                warn!(
                    "[RemoteTelemetry] 429 for {}, retry {} after {:?}",
                    activity_id, retries, backoff
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !status.is_success() {
                return Err(SyncError::HttpError {
                    message: format!("HTTP {}", status),
                    status_code: Some(status.as_u16()),
                });
            }

            let bytes = response.bytes().await.map_err(|e| SyncError::HttpError {
                message: format!("Body download error: {}", e),
                status_code: None,
            })?;

            let track: RawTrack =
                serde_json::from_slice(&bytes).map_err(|e| SyncError::ParseError {
                    message: format!("JSON parse error: {}", e),
                })?;

            let point_count = track.latlngs.as_ref().map_or(0, |v| v.len());
            debug!(
                "[RemoteTelemetry] Fetched {} ({} points, {:.1}KB)",
                activity_id,
                point_count,
                bytes.len() as f64 / 1024.0
            );

            return Ok(track);
        }
    }
}
