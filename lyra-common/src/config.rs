//! Configuration file resolution and loading
//!
//! Config file lookup follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `LYRA_CONFIG` environment variable
//! 3. `<config dir>/lyra/<module>.toml` if it exists
//! 4. Compiled defaults (no file)
//!
//! A missing or unreadable file never aborts startup: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LYRA_CONFIG";

/// Logging section shared by every module's TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Resolve the config file for `module` (e.g. "lyra-annotate")
pub fn resolve_config_path(module: &str, cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    default_config_path(module).filter(|path| path.exists())
}

/// `<config dir>/lyra/<module>.toml`
pub fn default_config_path(module: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lyra").join(format!("{module}.toml")))
}

/// Default data directory for local state (song database)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("lyra"))
        .unwrap_or_else(|| PathBuf::from("./lyra_data"))
}

/// Where a loaded config came from
#[derive(Debug)]
pub enum ConfigSource {
    /// No config file; compiled defaults
    Defaults,
    /// Parsed from this file
    File(PathBuf),
    /// The file could not be used; compiled defaults
    Fallback(Error),
}

impl ConfigSource {
    /// Report the outcome; call once a subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
            ConfigSource::File(path) => info!("Loaded config: {}", path.display()),
            ConfigSource::Fallback(e) => warn!("{} - using compiled defaults", e),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ConfigSource::Fallback(_))
    }
}

/// A config value plus its source
#[derive(Debug)]
pub struct LoadedConfig<T> {
    pub config: T,
    pub source: ConfigSource,
}

/// Load a TOML config, falling back to defaults when the file is absent or unreadable
///
/// Nothing is logged here: binaries load the config before tracing is initialized (the file
/// carries the log level), then call [`ConfigSource::log`].
pub fn load_config<T>(path: Option<&Path>) -> LoadedConfig<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return LoadedConfig {
            config: T::default(),
            source: ConfigSource::Defaults,
        };
    };

    match load_toml(path) {
        Ok(config) => LoadedConfig {
            config,
            source: ConfigSource::File(path.to_path_buf()),
        },
        Err(e) => LoadedConfig {
            config: T::default(),
            source: ConfigSource::Fallback(e),
        },
    }
}

/// Strictly load and parse a TOML config file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Non-empty, trimmed environment variable value
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key("   "));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = resolve_config_path("lyra-test", Some(Path::new("/tmp/explicit.toml")));
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }
}
