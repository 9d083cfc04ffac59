//! Annotation pipeline: resolution → scheduling → per-chunk annotation → events
//!
//! Each invocation owns its lines, chunks and counters. Events are produced lazily as the
//! stream is polled, so the transport can flush them one by one.
//!
//! Chunks are annotated in schedule order. With `concurrency > 1` several chunks may be in
//! flight at once, but results are still yielded in chunk order, so the event sequence is
//! the same for every setting.
//!
//! The pipeline does not observe client disconnects: once started, a request runs to
//! completion whether or not the stream is still being read.

use futures::stream::{self, Stream, StreamExt};
use lyra_common::api::AnnotateRequest;
use lyra_common::chunking::{index_lines, schedule};
use lyra_common::events::NO_LYRICS_MESSAGE;
use lyra_common::model::DEFAULT_CHUNK_SIZE;
use lyra_common::StreamEvent;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::services::{AnnotationWorker, SourceResolver};

/// Scheduling knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub chunk_size: usize,
    /// Chunks in flight at once (1 = strictly sequential)
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 1,
        }
    }
}

/// Shared, request-independent pipeline components
pub struct AnnotationPipeline {
    resolver: SourceResolver,
    worker: Arc<AnnotationWorker>,
    settings: PipelineSettings,
}

impl AnnotationPipeline {
    pub fn new(resolver: SourceResolver, worker: AnnotationWorker, settings: PipelineSettings) -> Self {
        Self {
            resolver,
            worker: Arc::new(worker),
            settings,
        }
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Run one request, yielding events in protocol order
    pub fn run(self: Arc<Self>, request: AnnotateRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        async_stream::stream! {
            let started = Instant::now();
            let tone = request.tone_mode();
            let caller_has_lines = request.has_lines();

            let resolution = self
                .resolver
                .resolve(request.title.as_deref(), request.artist.as_deref(), caller_has_lines)
                .await;

            let (lines, discovered) = if caller_has_lines {
                (request.hanzi_lines.unwrap_or_default(), false)
            } else {
                match resolution.lines {
                    Some(found) => (found, true),
                    None => (Vec::new(), false),
                }
            };

            if !lines.iter().any(|line| !line.trim().is_empty()) {
                info!(title = ?request.title, "No resolvable lines, ending stream");
                yield StreamEvent::info(NO_LYRICS_MESSAGE);
                return;
            }

            if discovered {
                yield StreamEvent::LyricsUpdate { lines: lines.clone() };
            }

            if let Some(lrc) = resolution.synced_lyrics {
                yield StreamEvent::LrcUpdate { lrc };
            }

            let chunks = schedule(&index_lines(lines), self.settings.chunk_size);
            let chunk_count = chunks.len();
            info!(
                chunks = chunk_count,
                chunk_size = self.settings.chunk_size,
                discovered,
                "Annotating lyrics"
            );

            let worker = self.worker.clone();
            let results = stream::iter(chunks)
                .map(move |chunk| {
                    let worker = worker.clone();
                    async move {
                        let result = worker.annotate(&chunk, tone).await;
                        (chunk, result)
                    }
                })
                .buffered(self.settings.concurrency.max(1));
            futures::pin_mut!(results);

            while let Some((chunk, result)) = results.next().await {
                tracing::debug!(
                    chunk_index = chunk.index,
                    start_offset = chunk.start_offset,
                    provenance = ?result.provenance,
                    "Chunk complete"
                );
                yield StreamEvent::PinyinChunk {
                    chunk_index: chunk.index,
                    data: result.pinyin,
                    provenance: Some(result.provenance),
                };
                yield StreamEvent::English {
                    chunk_index: chunk.index,
                    data: result.english,
                    provenance: Some(result.provenance),
                };
            }

            info!(
                chunks = chunk_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Annotation stream complete"
            );
        }
    }
}
