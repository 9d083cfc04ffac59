//! Newline-delimited JSON framing for stream events
//!
//! Decoding is incremental: network reads can end anywhere, including inside a multi-byte
//! UTF-8 sequence, so the decoder buffers raw bytes and only parses complete lines.

use super::StreamEvent;
use thiserror::Error;

/// Content type of the event stream
pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// A complete line that was not a valid stream event
#[derive(Debug, Error)]
#[error("Malformed stream event: {source}")]
pub struct DecodeError {
    /// Offending line (lossy UTF-8)
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

/// Encode one event as a single `\n`-terminated JSON line
pub fn encode_line(event: &StreamEvent) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Incremental NDJSON decoder
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns every event completed by it
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamEvent, DecodeError>> {
        self.buffer.extend_from_slice(bytes);

        let mut decoded = Vec::new();
        let mut consumed = 0;

        while let Some(pos) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + pos;
            if let Some(result) = decode_line(&self.buffer[consumed..end]) {
                decoded.push(result);
            }
            consumed = end + 1;
        }

        self.buffer.drain(..consumed);
        decoded
    }

    /// Decode a trailing fragment left without a final newline
    pub fn finish(&mut self) -> Option<Result<StreamEvent, DecodeError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes buffered but not yet terminated by a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(line: &[u8]) -> Option<Result<StreamEvent, DecodeError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    Some(serde_json::from_slice(line).map_err(|source| DecodeError {
        line: String::from_utf8_lossy(line).into_owned(),
        source,
    }))
}
