//! Error types for lyra-client

use lyra_common::events::ndjson::DecodeError;
use thiserror::Error;

/// Generation run errors
///
/// Transport, status and decode failures end the read loop but never discard merged state.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection or read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success response before the stream started
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A complete line that was not a valid event
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Another generation for the same song is still running
    #[error("Generation already in flight for song {0}")]
    Busy(String),
}

/// Song store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
