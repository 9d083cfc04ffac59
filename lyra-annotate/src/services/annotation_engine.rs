//! Primary transliteration + translation engine
//!
//! OpenAI-compatible chat completions API. The engine is asked for a JSON object with two
//! arrays (`pinyin`, `english`) of exactly one entry per input line. Models sometimes wrap
//! JSON in code fences or vary key casing; both are tolerated here, anything else is an error.

use async_trait::async_trait;
use lyra_common::ToneMode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Engine errors (all retryable by the worker)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not configured")]
    Unavailable,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Engine returned no content")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Length mismatch: expected {expected}, got pinyin={pinyin} english={english}")]
    LengthMismatch {
        expected: usize,
        pinyin: usize,
        english: usize,
    },
}

/// Parsed engine output (lengths not yet validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub pinyin: Vec<String>,
    pub english: Vec<String>,
}

impl EngineOutput {
    /// Require both arrays to have exactly `expected` entries
    pub fn validate(self, expected: usize) -> Result<Self, EngineError> {
        if self.pinyin.len() != expected || self.english.len() != expected {
            return Err(EngineError::LengthMismatch {
                expected,
                pinyin: self.pinyin.len(),
                english: self.english.len(),
            });
        }
        Ok(self)
    }
}

/// Transliteration + translation engine
#[async_trait]
pub trait AnnotationEngine: Send + Sync {
    /// Engine identifier for logging
    fn name(&self) -> &'static str;

    /// False when the engine cannot be called at all (e.g. no credentials)
    fn is_available(&self) -> bool {
        true
    }

    /// Annotate one batch of lines
    async fn annotate(&self, lines: &[String], tone: ToneMode) -> Result<EngineOutput, EngineError>;
}

/// Instruction sent with every batch
pub fn build_instruction(line_count: usize, tone: ToneMode) -> String {
    let tone_rule = match tone {
        ToneMode::Numbers => "Write pinyin with tone numbers after each syllable (ni3 hao3).",
        ToneMode::Marks => "Write pinyin with tone diacritics (nǐ hǎo).",
    };

    format!(
        "You annotate Chinese song lyrics. You receive a JSON object with a \"lines\" array of \
         {line_count} lines. Respond with only a JSON object of the form \
         {{\"pinyin\": [...], \"english\": [...]}} where each array has exactly {line_count} \
         strings, one per input line, in the same order. {tone_rule} Keep the original \
         punctuation. Translate each line into natural English. If an input line is empty, \
         output an empty string for it in both arrays."
    )
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Deserialize)]
struct RawEngineOutput {
    #[serde(default, alias = "Pinyin", alias = "PINYIN")]
    pinyin: Option<Vec<String>>,
    #[serde(default, alias = "English", alias = "ENGLISH", alias = "translation")]
    english: Option<Vec<String>>,
}

/// Parse the engine's text content into an [`EngineOutput`]
pub fn parse_engine_output(raw: &str) -> Result<EngineOutput, EngineError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(EngineError::EmptyResponse);
    }

    let parsed: RawEngineOutput =
        serde_json::from_str(body).map_err(|e| EngineError::ParseError(e.to_string()))?;

    match (parsed.pinyin, parsed.english) {
        (Some(pinyin), Some(english)) => Ok(EngineOutput { pinyin, english }),
        (None, _) => Err(EngineError::ParseError("missing pinyin array".to_string())),
        (_, None) => Err(EngineError::ParseError("missing english array".to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions engine
pub struct ChatCompletionsEngine {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionsEngine {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl AnnotationEngine for ChatCompletionsEngine {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn annotate(&self, lines: &[String], tone: ToneMode) -> Result<EngineOutput, EngineError> {
        let api_key = self.api_key.as_deref().ok_or(EngineError::Unavailable)?;

        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": build_instruction(lines.len(), tone)},
                {"role": "user", "content": json!({"lines": lines}).to_string()},
            ],
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::ApiError(status.as_u16(), error_text));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| EngineError::ParseError(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(EngineError::EmptyResponse)?;

        parse_engine_output(&content)
    }
}
