//! HTTP document source.
//!
//! Polls the track and latest-position documents from a web server. Every
//! request bypasses caches:
//! - `Cache-Control: no-cache` and `Pragma: no-cache` headers
//! - a `_=<millis>` query parameter so intermediaries see a fresh URL

use crate::source::{Document, DocumentSource};
use crate::{Result, TrackerConfig, TrackerError};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

pub struct HttpSource {
    client: Client,
    track_url: String,
    latest_url: String,
}

impl HttpSource {
    pub fn new(track_url: impl Into<String>, latest_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TrackerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let source = Self {
            client,
            track_url: track_url.into(),
            latest_url: latest_url.into(),
        };
        info!(
            "[HttpSource] Polling {} and {} (timeout {:?})",
            source.track_url, source.latest_url, timeout
        );
        Ok(source)
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        Self::new(config.track_url.clone(), config.latest_url.clone(), config.request_timeout())
    }

    fn url(&self, document: Document) -> &str {
        match document {
            Document::Track => &self.track_url,
            Document::Latest => &self.latest_url,
        }
    }
}

fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, document: Document) -> Result<Value> {
        let url = self.url(document);
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .query(&[("_", cache_buster())])
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|source| TrackerError::Request { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            warn!("[HttpSource] {} -> HTTP {}", url, status.as_u16());
            return Err(TrackerError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TrackerError::Request { url: url.to_string(), source })?;

        debug!(
            "[HttpSource] {} {}: {} bytes in {}ms",
            document.name(),
            url,
            bytes.len(),
            start.elapsed().as_millis()
        );

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn location(&self, document: Document) -> String {
        self.url(document).to_string()
    }
}
