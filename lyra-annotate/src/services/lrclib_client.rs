//! Lyric catalog client (LRCLIB search API)
//!
//! Catalog responses are loosely shaped: ids may be numbers or strings, field casing varies
//! between mirrors, and lyric fields are frequently null. Raw entries are validated here and
//! entries missing an id or a title are dropped, so nothing downstream touches raw JSON.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "Lyra/0.1.0 (https://github.com/lyra-lyrics/lyra)";

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Validated catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub artist_name: Option<String>,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl Candidate {
    /// True when the entry carries non-blank synced lyrics
    pub fn has_synced_lyrics(&self) -> bool {
        self.synced_lyrics
            .as_deref()
            .is_some_and(|lrc| !lrc.trim().is_empty())
    }
}

/// Raw catalog entry as received
#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "trackName")]
    track_name: Option<String>,
    #[serde(default, rename = "artistName", alias = "artist_name")]
    artist_name: Option<String>,
    #[serde(default, rename = "plainLyrics", alias = "plain_lyrics")]
    plain_lyrics: Option<String>,
    #[serde(default, rename = "syncedLyrics", alias = "synced_lyrics")]
    synced_lyrics: Option<String>,
}

impl RawCandidate {
    fn validate(self) -> Option<Candidate> {
        let id = match self.id? {
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        // LRCLIB sends both `name` and `trackName`; mirrors may send only one
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or(self.track_name.filter(|n| !n.trim().is_empty()))?;

        Some(Candidate {
            id,
            name,
            artist_name: self.artist_name,
            plain_lyrics: self.plain_lyrics.filter(|l| !l.trim().is_empty()),
            synced_lyrics: self.synced_lyrics.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// Parse a catalog search response, dropping invalid entries
pub fn parse_candidates(body: &str) -> Result<Vec<Candidate>, CatalogError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| CatalogError::ParseError(e.to_string()))?;

    let total = raw.len();
    let candidates: Vec<Candidate> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawCandidate>(value).ok())
        .filter_map(RawCandidate::validate)
        .collect();

    if candidates.len() < total {
        tracing::debug!(
            dropped = total - candidates.len(),
            "Dropped catalog entries missing id or title"
        );
    }

    Ok(candidates)
}

/// Searchable lyric catalog
#[async_trait]
pub trait LyricCatalog: Send + Sync {
    /// Catalog identifier for logging
    fn name(&self) -> &'static str;

    /// Free-text search returning candidates in catalog order
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, CatalogError>;
}

/// LRCLIB API client
pub struct LrclibClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LyricCatalog for LrclibClient {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>, CatalogError> {
        let url = format!("{}/api/search", self.base_url);
        tracing::debug!(query = %query, url = %url, "Querying lyric catalog");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let candidates = parse_candidates(&body)?;
        tracing::debug!(query = %query, count = candidates.len(), "Catalog search complete");

        Ok(candidates)
    }
}
