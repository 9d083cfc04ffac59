//! Configuration for lyra-annotate
//!
//! Settings come from the TOML file (see `lyra_common::config` for lookup order) with
//! environment overrides for the engine endpoint and credentials. Priority for the engine
//! API key: ENV → TOML. No key means the primary engine is unconfigured and every chunk
//! goes straight to the local fallback.

use lyra_common::config::{env_value, is_valid_key, LoggingConfig};
use lyra_common::model::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::retry::RetryPolicy;

pub const ENGINE_API_KEY_ENV: &str = "LYRA_ENGINE_API_KEY";
pub const ENGINE_BASE_URL_ENV: &str = "LYRA_ENGINE_BASE_URL";
pub const ENGINE_MODEL_ENV: &str = "LYRA_ENGINE_MODEL";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5730;

/// Top-level lyra-annotate.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub catalog: CatalogConfig,
    pub probe: ProbeConfig,
    pub engine: EngineConfig,
    pub translation: TranslationConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Lyric catalog (LRCLIB-compatible search API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Upper bound for one search call; expiry counts as "no match"
    pub timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lrclib.net".to_string(),
            timeout_ms: 3000,
        }
    }
}

/// Secondary catalog existence probe (diagnostic logging only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://musicbrainz.org/ws/2".to_string(),
        }
    }
}

/// Primary transliteration + translation engine (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Generic translation service used by the fallback path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.googleapis.com/translate_a/single".to_string(),
            source_lang: "zh-CN".to_string(),
            target_lang: "en".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Chunking, retry and concurrency knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` waits `n * backoff_step_ms`
    pub backoff_step_ms: u64,
    /// Chunks annotated concurrently; events are still emitted in chunk order
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_attempts: 3,
            backoff_step_ms: 1000,
            concurrency: 1,
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_attempts, Duration::from_millis(self.backoff_step_ms))
    }
}

impl AnnotateConfig {
    /// Apply environment overrides for the engine section
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_value(ENGINE_BASE_URL_ENV) {
            self.engine.base_url = url;
        }
        if let Some(model) = env_value(ENGINE_MODEL_ENV) {
            self.engine.model = model;
        }
        self.engine.api_key = resolve_engine_api_key(env_value(ENGINE_API_KEY_ENV), &self.engine);
    }
}

/// Resolve the engine API key from ENV and TOML
///
/// Returns `None` when neither source holds a usable key.
pub fn resolve_engine_api_key(env_key: Option<String>, engine: &EngineConfig) -> Option<String> {
    let env_key = env_key.filter(|k| is_valid_key(k));
    let toml_key = engine.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Engine API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Engine API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Engine API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Engine API key not configured ({} or [engine].api_key); annotations will use the local fallback",
        ENGINE_API_KEY_ENV
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_wins_over_toml() {
        let engine = EngineConfig {
            api_key: Some("toml-key".to_string()),
            ..Default::default()
        };
        let key = resolve_engine_api_key(Some("env-key".to_string()), &engine);
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_blank_keys_are_unconfigured() {
        let engine = EngineConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(resolve_engine_api_key(Some(String::new()), &engine).is_none());
    }

    #[test]
    fn test_toml_key_used_without_env() {
        let engine = EngineConfig {
            api_key: Some("toml-key".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_engine_api_key(None, &engine).as_deref(), Some("toml-key"));
    }

    #[test]
    fn test_defaults() {
        let config = AnnotateConfig::default();
        assert_eq!(config.pipeline.chunk_size, 10);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.concurrency, 1);
        assert_eq!(config.catalog.timeout_ms, 3000);
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn test_partial_toml() {
        let config: AnnotateConfig = toml::from_str(
            r#"
            [pipeline]
            chunk_size = 5

            [engine]
            model = "local-model"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.chunk_size, 5);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.engine.model, "local-model");
        assert_eq!(config.engine.base_url, "https://api.openai.com/v1");
    }
}
