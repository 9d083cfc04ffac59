//! Common error types for Lyra

use thiserror::Error;

/// Common result type for Lyra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Lyra crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
