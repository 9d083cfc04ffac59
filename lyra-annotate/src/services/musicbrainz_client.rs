//! MusicBrainz existence probe
//!
//! Secondary catalog used only to log whether a title/artist pair is known elsewhere.
//! Its result never influences lyric resolution.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::lrclib_client::CatalogError;

const USER_AGENT: &str = "Lyra/0.1.0 (https://github.com/lyra-lyrics/lyra)";
const REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Existence check against a secondary catalog
#[async_trait]
pub trait CatalogProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of matching recordings
    async fn count_matches(&self, title: &str, artist: Option<&str>) -> Result<u64, CatalogError>;
}

/// Recording search response (only the count is used)
#[derive(Debug, Deserialize)]
struct MBSearchResponse {
    #[serde(default)]
    count: Option<u64>,
}

/// Minimum spacing between probe requests (MusicBrainz allows one per second)
struct RequestSpacing {
    previous: Mutex<Option<Instant>>,
    interval: Duration,
}

impl RequestSpacing {
    fn new(interval: Duration) -> Self {
        Self {
            previous: Mutex::new(None),
            interval,
        }
    }

    /// Sleep until `interval` has passed since the previous request, then claim the slot
    async fn acquire(&self) {
        let mut previous = self.previous.lock().await;

        if let Some(remaining) = (*previous).and_then(|at| self.interval.checked_sub(at.elapsed())) {
            tracing::debug!(wait_ms = remaining.as_millis() as u64, "Spacing probe request");
            tokio::time::sleep(remaining).await;
        }

        *previous = Some(Instant::now());
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    spacing: Arc<RequestSpacing>,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            spacing: Arc::new(RequestSpacing::new(REQUEST_INTERVAL)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Lucene query for a recording search
fn recording_query(title: &str, artist: Option<&str>) -> String {
    let title = title.replace('"', " ");
    match artist.map(|a| a.replace('"', " ")).filter(|a| !a.trim().is_empty()) {
        Some(artist) => format!("recording:\"{}\" AND artist:\"{}\"", title.trim(), artist.trim()),
        None => format!("recording:\"{}\"", title.trim()),
    }
}

#[async_trait]
impl CatalogProbe for MusicBrainzClient {
    fn name(&self) -> &'static str {
        "musicbrainz"
    }

    async fn count_matches(&self, title: &str, artist: Option<&str>) -> Result<u64, CatalogError> {
        self.spacing.acquire().await;

        let url = format!("{}/recording", self.base_url);
        let query = recording_query(title, artist);
        tracing::debug!(query = %query, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError(status.as_u16(), error_text));
        }

        let parsed: MBSearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        Ok(parsed.count.unwrap_or(0))
    }
}
