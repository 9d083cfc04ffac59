//! lyra-annotate - Lyric Annotation Service
//!
//! Streams pinyin and English annotations for Chinese lyrics as NDJSON.
//!
//! **Module Identity:**
//! - Name: lyra-annotate
//! - Default port: 5730

use anyhow::Result;
use clap::Parser;
use lyra_annotate::config::AnnotateConfig;
use lyra_annotate::{build_pipeline, build_router, AppState};
use lyra_common::config::{load_config, resolve_config_path, LoadedConfig};
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments (override the TOML file)
#[derive(Debug, Parser)]
#[command(name = "lyra-annotate", version, about = "Lyric annotation streaming service")]
struct Args {
    /// Path to lyra-annotate.toml
    #[arg(long, env = "LYRA_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "LYRA_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(long, env = "LYRA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path("lyra-annotate", args.config.as_deref());
    let LoadedConfig {
        config: mut config,
        source,
    } = load_config::<AnnotateConfig>(config_path.as_deref());

    // Initialize tracing (RUST_LOG wins over the TOML level)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting lyra-annotate v{}", env!("CARGO_PKG_VERSION"));
    source.log();

    config.apply_env_overrides();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let engine_available = config.engine.api_key.is_some();
    let pipeline = build_pipeline(&config)?;
    info!(
        chunk_size = config.pipeline.chunk_size,
        max_attempts = config.pipeline.max_attempts,
        concurrency = config.pipeline.concurrency,
        engine = %config.engine.model,
        engine_available,
        "Pipeline initialized"
    );

    let state = AppState::new(pipeline, engine_available);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
