//! Stream event types for the annotation pipeline
//!
//! The service emits these as newline-delimited JSON (see [`ndjson`]). Ordering guarantees:
//! - `LyricsUpdate` at most once per request, before the first chunk event
//! - `LrcUpdate` as soon as synced lyrics are known
//! - For chunk `k`, `PinyinChunk` is immediately followed by `English`
//! - A request with no resolvable lines yields a single `Info` and nothing else

pub mod ndjson;

use crate::model::Provenance;
use serde::{Deserialize, Serialize};

/// Message sent when no lyrics could be found or supplied
pub const NO_LYRICS_MESSAGE: &str = "No lyrics found for this song";

/// Progress event emitted by the annotation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    /// Informational notice (terminal when no lines are resolvable)
    Info { message: String },

    /// Lines discovered by the source resolver (caller supplied none)
    LyricsUpdate { lines: Vec<String> },

    /// Time-synced lyrics (LRC) for the song
    LrcUpdate { lrc: String },

    /// Pinyin for chunk `chunk_index`
    PinyinChunk {
        #[serde(rename = "chunkIndex")]
        chunk_index: usize,
        data: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provenance: Option<Provenance>,
    },

    /// English translation for chunk `chunk_index`
    English {
        #[serde(rename = "chunkIndex")]
        chunk_index: usize,
        data: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provenance: Option<Provenance>,
    },

    /// Failure after the stream was established
    Error { message: String },
}

impl StreamEvent {
    pub fn info(message: impl Into<String>) -> Self {
        StreamEvent::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// Get event type as string (matches the wire `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::Info { .. } => "info",
            StreamEvent::LyricsUpdate { .. } => "lyricsUpdate",
            StreamEvent::LrcUpdate { .. } => "lrcUpdate",
            StreamEvent::PinyinChunk { .. } => "pinyinChunk",
            StreamEvent::English { .. } => "english",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Chunk index for chunk events
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            StreamEvent::PinyinChunk { chunk_index, .. } | StreamEvent::English { chunk_index, .. } => {
                Some(*chunk_index)
            }
            _ => None,
        }
    }
}
