//! lyra-client configuration (`lyra-client.toml`)

use lyra_common::config::{default_data_dir, LoggingConfig};
use lyra_common::model::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerEndpoint,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEndpoint {
    pub url: String,
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5730".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Song database; defaults to `<data dir>/lyra/songs.db`
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("songs.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Must match the server's `pipeline.chunk_size`
    pub chunk_size: usize,
    pub tone_numbers: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tone_numbers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [server]
            url = "http://lyrics.local:9000"

            [generation]
            tone_numbers = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "http://lyrics.local:9000");
        assert!(config.generation.tone_numbers);
        assert_eq!(config.generation.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.store.resolved_path().ends_with("songs.db"));
    }
}
