//! Per-chunk annotation with retry and deterministic fallback
//!
//! Primary path: the external engine, wrapped in the retry policy. A response only counts
//! when both arrays match the chunk length exactly.
//!
//! Fallback path (engine unavailable or attempts exhausted):
//! - pinyin from the local rule-based transliteration
//! - english from one batched call to the translation service, split back per line
//! - arrays forced to the chunk length (truncate, or pad with a placeholder)
//! - every non-empty string tagged with the fallback marker
//!
//! `annotate` never fails: the worst case is a fully padded fallback result.

use lyra_common::model::{tag_fallback, MISSING_TRANSLATION};
use lyra_common::romanize::romanize;
use lyra_common::{AnnotationResult, Chunk, Provenance, ToneMode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::annotation_engine::{AnnotationEngine, EngineOutput};
use super::translation_client::Translator;
use crate::utils::retry::RetryPolicy;

/// Separator between lines in a batched fallback translation
pub const TRANSLATION_DELIMITER: &str = "\n|||\n";

/// Delimiter token searched for after translation (whitespace may not survive)
const DELIMITER_TOKEN: &str = "|||";

/// Annotates chunks; shared across requests, holds no per-request state
pub struct AnnotationWorker {
    engine: Arc<dyn AnnotationEngine>,
    translator: Arc<dyn Translator>,
    retry: RetryPolicy,
}

impl AnnotationWorker {
    pub fn new(
        engine: Arc<dyn AnnotationEngine>,
        translator: Arc<dyn Translator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            translator,
            retry,
        }
    }

    /// Annotate one chunk
    pub async fn annotate(&self, chunk: &Chunk, tone: ToneMode) -> AnnotationResult {
        let texts = chunk.texts();

        if !self.engine.is_available() {
            debug!(
                chunk_index = chunk.index,
                engine = self.engine.name(),
                "Engine unavailable, using fallback"
            );
            return self.fallback(&texts, tone).await;
        }

        match self.annotate_primary(chunk.index, &texts, tone).await {
            Some(output) => AnnotationResult {
                pinyin: output.pinyin,
                english: output.english,
                provenance: Provenance::Primary,
            },
            None => self.fallback(&texts, tone).await,
        }
    }

    async fn annotate_primary(
        &self,
        chunk_index: usize,
        texts: &[String],
        tone: ToneMode,
    ) -> Option<EngineOutput> {
        let engine = &self.engine;
        let expected = texts.len();
        let operation = format!("annotate chunk {chunk_index}");

        let outcome = self
            .retry
            .run(&operation, move |_attempt| async move {
                engine.annotate(texts, tone).await?.validate(expected)
            })
            .await;

        match outcome {
            Ok(output) => {
                debug!(chunk_index, lines = expected, "Chunk annotated by engine");
                Some(output)
            }
            Err(exhausted) => {
                info!(
                    chunk_index,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Engine attempts exhausted, degrading to fallback"
                );
                None
            }
        }
    }

    /// Deterministic local annotation
    pub async fn fallback(&self, texts: &[String], tone: ToneMode) -> AnnotationResult {
        let pinyin = texts
            .iter()
            .map(|text| {
                if text.trim().is_empty() {
                    String::new()
                } else {
                    tag_fallback(&romanize(text, tone))
                }
            })
            .collect();

        let english = self.fallback_translations(texts).await;

        AnnotationResult {
            pinyin,
            english,
            provenance: Provenance::Fallback,
        }
    }

    async fn fallback_translations(&self, texts: &[String]) -> Vec<String> {
        let sources: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(index, text)| (index, text.as_str()))
            .collect();

        let mut english = vec![String::new(); texts.len()];
        if sources.is_empty() {
            return english;
        }

        let batch: Vec<&str> = sources.iter().map(|(_, text)| *text).collect();
        let translated = match self.translator.translate(&batch.join(TRANSLATION_DELIMITER)).await {
            Ok(text) => split_translation(&text),
            Err(e) => {
                warn!(
                    translator = self.translator.name(),
                    error = %e,
                    "Fallback translation failed, padding with placeholders"
                );
                Vec::new()
            }
        };

        // Only non-blank lines were sent; scatter results back to their source slots
        for ((index, _), line) in sources.iter().zip(fit_to_length(translated, sources.len())) {
            english[*index] = tag_fallback(&line);
        }
        english
    }
}

/// Split a batched translation back into lines
///
/// Uses the delimiter token when it survived translation, plain newlines otherwise.
pub fn split_translation(text: &str) -> Vec<String> {
    if text.contains(DELIMITER_TOKEN) {
        text.split(DELIMITER_TOKEN)
            .map(|part| part.trim().to_string())
            .collect()
    } else {
        text.lines().map(|line| line.trim().to_string()).collect()
    }
}

/// Truncate or pad with the placeholder to exactly `len` entries
pub fn fit_to_length(mut parts: Vec<String>, len: usize) -> Vec<String> {
    parts.truncate(len);
    while parts.len() < len {
        parts.push(MISSING_TRANSLATION.to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_delimiter() {
        let parts = split_translation("The moon\n|||\nmy heart ||| love");
        assert_eq!(parts, vec!["The moon", "my heart", "love"]);
    }

    #[test]
    fn test_split_falls_back_to_newlines() {
        let parts = split_translation("The moon\nmy heart");
        assert_eq!(parts, vec!["The moon", "my heart"]);
    }

    #[test]
    fn test_fit_to_length() {
        let padded = fit_to_length(vec!["a".into()], 3);
        assert_eq!(padded, vec!["a", MISSING_TRANSLATION, MISSING_TRANSLATION]);

        let truncated = fit_to_length(vec!["a".into(), "b".into(), "c".into()], 2);
        assert_eq!(truncated, vec!["a", "b"]);

        assert!(fit_to_length(vec!["a".into()], 0).is_empty());
    }
}
