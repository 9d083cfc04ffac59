//! Utility modules for lyra-annotate

pub mod retry;

pub use retry::{Backoff, RetryExhausted, RetryPolicy};
