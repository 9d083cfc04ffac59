//! # Lyra Common Library
//!
//! Shared code for the Lyra annotation service and its clients:
//! - Line/chunk data model and provenance tags
//! - Stream event types and the NDJSON wire format
//! - Chunk scheduling
//! - Local (rule-based) pinyin transliteration
//! - LRC helpers
//! - Configuration loading

pub mod api;
pub mod chunking;
pub mod config;
pub mod error;
pub mod events;
pub mod lrc;
pub mod model;
pub mod romanize;

pub use error::{Error, Result};
pub use events::StreamEvent;
pub use model::{AnnotationResult, Chunk, LyricLine, Provenance, ToneMode};
