//! lyra-client library interface
//!
//! Consumes the annotation stream of lyra-annotate and keeps a persisted, line-aligned copy of
//! each song up to date while events arrive.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod transport;

pub use crate::error::{ClientError, ClientResult, StoreError};
pub use crate::reconciler::{merge, MergeContext, MergeOutcome, Notice, Phase, StreamPhase, StreamReconciler, WorkingState};
pub use crate::session::{ClientSession, GenerationOutcome, InFlight};
pub use crate::store::{Song, SongStore, SqliteSongStore};
pub use crate::transport::{AnnotateTransport, ByteStream, HttpTransport};
