//! Configuration loading and environment overrides

use lyra_annotate::build_pipeline;
use lyra_annotate::config::{
    AnnotateConfig, ENGINE_API_KEY_ENV, ENGINE_BASE_URL_ENV, ENGINE_MODEL_ENV,
};
use lyra_common::config::{load_config, load_toml};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn clear_engine_env() {
    std::env::remove_var(ENGINE_API_KEY_ENV);
    std::env::remove_var(ENGINE_BASE_URL_ENV);
    std::env::remove_var(ENGINE_MODEL_ENV);
}

#[test]
fn test_load_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lyra-annotate.toml");
    fs::write(
        &path,
        r#"
        [server]
        host = "0.0.0.0"
        port = 8080

        [logging]
        level = "debug"

        [catalog]
        timeout_ms = 1500

        [probe]
        enabled = false

        [pipeline]
        chunk_size = 8
        max_attempts = 5
        backoff_step_ms = 250
        concurrency = 2
        "#,
    )
    .unwrap();

    let config: AnnotateConfig = load_toml(&path).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.catalog.timeout_ms, 1500);
    assert!(!config.probe.enabled);
    assert_eq!(config.pipeline.chunk_size, 8);
    assert_eq!(config.pipeline.retry_policy().attempts(), 5);
    assert_eq!(config.pipeline.concurrency, 2);
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = load_config::<AnnotateConfig>(Some(&temp_dir.path().join("absent.toml")));
    assert!(loaded.source.is_fallback());
    let config = loaded.config;

    assert_eq!(config.server.port, 5730);
    assert_eq!(config.pipeline.chunk_size, 10);
}

#[test]
#[serial]
fn test_env_overrides_engine_section() {
    clear_engine_env();
    std::env::set_var(ENGINE_BASE_URL_ENV, "http://localhost:11434/v1");
    std::env::set_var(ENGINE_MODEL_ENV, "qwen2.5");
    std::env::set_var(ENGINE_API_KEY_ENV, "  sk-test  ");

    let mut config = AnnotateConfig::default();
    config.apply_env_overrides();
    clear_engine_env();

    assert_eq!(config.engine.base_url, "http://localhost:11434/v1");
    assert_eq!(config.engine.model, "qwen2.5");
    assert_eq!(config.engine.api_key.as_deref(), Some("sk-test"));
}

#[test]
#[serial]
fn test_without_key_engine_is_unconfigured() {
    clear_engine_env();

    let mut config = AnnotateConfig::default();
    config.apply_env_overrides();

    assert!(config.engine.api_key.is_none());
    assert!(build_pipeline(&config).is_ok());
}
