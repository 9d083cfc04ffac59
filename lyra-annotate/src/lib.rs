//! lyra-annotate library interface
//!
//! Exposes the pipeline, services and router for the binary and for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use anyhow::Context;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::AnnotateConfig;
use crate::pipeline::{AnnotationPipeline, PipelineSettings};
use crate::services::{
    AnnotationWorker, ChatCompletionsEngine, GoogleTranslateClient, LrclibClient,
    MusicBrainzClient, SourceResolver,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared pipeline components (each request runs independently)
    pub pipeline: Arc<AnnotationPipeline>,
    /// Whether the primary engine is configured
    pub engine_available: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: AnnotationPipeline, engine_available: bool) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            engine_available,
            startup_time: Utc::now(),
        }
    }
}

/// Wire the production clients described by `config`
pub fn build_pipeline(config: &AnnotateConfig) -> anyhow::Result<AnnotationPipeline> {
    let catalog_timeout = Duration::from_millis(config.catalog.timeout_ms);

    let catalog = LrclibClient::new(&config.catalog.base_url, catalog_timeout)
        .context("Failed to create lyric catalog client")?;
    let mut resolver = SourceResolver::new(Arc::new(catalog), catalog_timeout);

    if config.probe.enabled {
        let probe = MusicBrainzClient::new(&config.probe.base_url)
            .context("Failed to create MusicBrainz client")?;
        resolver = resolver.with_probe(Arc::new(probe));
    }

    let engine = ChatCompletionsEngine::new(
        &config.engine.base_url,
        &config.engine.model,
        config.engine.api_key.clone(),
        Duration::from_secs(config.engine.timeout_secs),
    )
    .context("Failed to create annotation engine client")?;

    let translator = GoogleTranslateClient::new(
        &config.translation.base_url,
        &config.translation.source_lang,
        &config.translation.target_lang,
        Duration::from_secs(config.translation.timeout_secs),
    )
    .context("Failed to create translation client")?;

    let worker = AnnotationWorker::new(
        Arc::new(engine),
        Arc::new(translator),
        config.pipeline.retry_policy(),
    );

    let settings = PipelineSettings {
        chunk_size: config.pipeline.chunk_size.max(1),
        concurrency: config.pipeline.concurrency.max(1),
    };

    Ok(AnnotationPipeline::new(resolver, worker, settings))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::annotate_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
