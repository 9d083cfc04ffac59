//! Test Helper Utilities
//!
//! In-process stand-ins for the external collaborators of lyra-annotate.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use lyra_annotate::pipeline::{AnnotationPipeline, PipelineSettings};
use lyra_annotate::services::{
    AnnotationEngine, AnnotationWorker, Candidate, CatalogError, EngineError, EngineOutput,
    LyricCatalog, SourceResolver, TranslateError, Translator,
};
use lyra_annotate::utils::{Backoff, RetryPolicy};
use lyra_common::api::AnnotateRequest;
use lyra_common::{StreamEvent, ToneMode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Catalog returning fixed candidates for any query
#[derive(Default)]
pub struct FakeCatalog {
    pub candidates: Vec<Candidate>,
    pub fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LyricCatalog for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake-catalog"
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>, CatalogError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(CatalogError::NetworkError("connection refused".to_string()));
        }
        Ok(self.candidates.clone())
    }
}

/// Engine that always fails and counts calls
#[derive(Default)]
pub struct FailingEngine {
    pub calls: AtomicUsize,
}

impl FailingEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnnotationEngine for FailingEngine {
    fn name(&self) -> &'static str {
        "failing-engine"
    }

    async fn annotate(&self, _lines: &[String], _tone: ToneMode) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::ApiError(503, "overloaded".to_string()))
    }
}

/// Engine that is not configured
pub struct UnavailableEngine;

#[async_trait]
impl AnnotationEngine for UnavailableEngine {
    fn name(&self) -> &'static str {
        "unavailable-engine"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn annotate(&self, _lines: &[String], _tone: ToneMode) -> Result<EngineOutput, EngineError> {
        Err(EngineError::Unavailable)
    }
}

/// Engine producing `py:<line>` / `en:<line>`, optionally short by one entry for the first
/// `short_responses` calls
#[derive(Default)]
pub struct EchoEngine {
    pub short_responses: usize,
    pub calls: AtomicUsize,
}

impl EchoEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnnotationEngine for EchoEngine {
    fn name(&self) -> &'static str {
        "echo-engine"
    }

    async fn annotate(&self, lines: &[String], _tone: ToneMode) -> Result<EngineOutput, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut pinyin: Vec<String> = lines.iter().map(|l| format!("py:{l}")).collect();
        let english = lines.iter().map(|l| format!("en:{l}")).collect();
        if call < self.short_responses {
            pinyin.pop();
        }
        Ok(EngineOutput { pinyin, english })
    }
}

/// Translator prefixing each delimited line with `EN `
#[derive(Default)]
pub struct EchoTranslator {
    /// Replace the delimiter with plain newlines, as some services do
    pub drop_delimiter: bool,
    /// Return only this many lines
    pub truncate_to: Option<usize>,
    /// Drop segments that are blank after trimming
    pub collapse_blank: bool,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

#[async_trait]
impl Translator for EchoTranslator {
    fn name(&self) -> &'static str {
        "echo-translator"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(text.to_string());
        let mut parts: Vec<String> = text
            .split("\n|||\n")
            .filter(|p| !(self.collapse_blank && p.trim().is_empty()))
            .map(|p| format!("EN {p}"))
            .collect();
        if let Some(limit) = self.truncate_to {
            parts.truncate(limit);
        }
        let separator = if self.drop_delimiter { "\n" } else { " ||| " };
        Ok(parts.join(separator))
    }
}

/// Translator that always fails
pub struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    fn name(&self) -> &'static str {
        "failing-translator"
    }

    async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
        Err(TranslateError::ApiError(429, "quota".to_string()))
    }
}

/// Retry policy without sleeping
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy::new(3, Backoff::None)
}

pub fn worker(engine: Arc<dyn AnnotationEngine>, translator: Arc<dyn Translator>) -> AnnotationWorker {
    AnnotationWorker::new(engine, translator, instant_retry())
}

pub fn pipeline(
    catalog: Arc<dyn LyricCatalog>,
    engine: Arc<dyn AnnotationEngine>,
    translator: Arc<dyn Translator>,
    settings: PipelineSettings,
) -> Arc<AnnotationPipeline> {
    let resolver = SourceResolver::new(catalog, Duration::from_secs(3));
    Arc::new(AnnotationPipeline::new(resolver, worker(engine, translator), settings))
}

/// Run a request to completion and collect its events
pub async fn collect_events(pipeline: Arc<AnnotationPipeline>, request: AnnotateRequest) -> Vec<StreamEvent> {
    pipeline.run(request).collect().await
}

pub fn chinese_lines(count: usize) -> Vec<String> {
    let pool = ["月亮代表我的心", "你问我爱你有多深", "我爱你有几分", "我的情也真", "我的爱也真"];
    (0..count).map(|i| pool[i % pool.len()].to_string()).collect()
}

pub fn candidate(id: &str, name: &str, plain: Option<&str>, synced: Option<&str>) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        artist_name: Some("邓丽君".to_string()),
        plain_lyrics: plain.map(str::to_string),
        synced_lyrics: synced.map(str::to_string),
    }
}
