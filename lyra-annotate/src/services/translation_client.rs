//! Generic machine translation service (fallback path)
//!
//! Batch text in, translated text out. The response is the nested-array JSON of the
//! `translate_a/single` endpoint: `[[["translated", "source", ...], ...], ...]`.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Translation errors
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Text translation service
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

/// Concatenate the translated segments of a `translate_a/single` response
pub fn parse_segments(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::ParseError("missing segment array".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::ParseError("no translated segments".to_string()));
    }
    Ok(translated)
}

/// Google `translate_a/single` client
pub struct GoogleTranslateClient {
    http_client: reqwest::Client,
    base_url: String,
    source_lang: String,
    target_lang: String,
}

impl GoogleTranslateClient {
    pub fn new(
        base_url: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslateError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    fn name(&self) -> &'static str {
        "google-translate"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .http_client
            .post(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| TranslateError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranslateError::ApiError(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::ParseError(e.to_string()))?;

        parse_segments(&body)
    }
}
