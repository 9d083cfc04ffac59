//! Services for lyra-annotate
//!
//! External clients (lyric catalog, secondary probe, annotation engine, translation) sit
//! behind traits so the resolver and worker can be exercised without the network.

pub mod annotation_engine;
pub mod annotation_worker;
pub mod lrclib_client;
pub mod musicbrainz_client;
pub mod source_resolver;
pub mod translation_client;

pub use annotation_engine::{AnnotationEngine, ChatCompletionsEngine, EngineError, EngineOutput};
pub use annotation_worker::AnnotationWorker;
pub use lrclib_client::{Candidate, CatalogError, LrclibClient, LyricCatalog};
pub use musicbrainz_client::{CatalogProbe, MusicBrainzClient};
pub use source_resolver::{Resolution, SourceResolver};
pub use translation_client::{GoogleTranslateClient, TranslateError, Translator};
