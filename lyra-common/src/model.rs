//! Line-aligned data model shared by the annotation service and its clients

use serde::{Deserialize, Serialize};

/// Default number of lines per annotation chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Trailing tag appended to every fallback-generated annotation
pub const FALLBACK_MARKER: &str = " \u{2020}";

/// Placeholder used when a fallback translation came back short
pub const MISSING_TRANSLATION: &str = "(untranslated)";

/// One source line with its global position in the song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    pub index: usize,
    pub text: String,
}

impl LyricLine {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// True when the line has no visible content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Contiguous batch of lines annotated as a unit
///
/// `start_offset` is the global index of the first line and is unique per chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the schedule (0-based)
    pub index: usize,
    /// Global index of the first line in this chunk
    pub start_offset: usize,
    pub lines: Vec<LyricLine>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line texts in chunk order
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.text.clone()).collect()
    }

    /// Global index range this chunk is allowed to write
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_offset..self.start_offset + self.lines.len()
    }
}

/// Tone rendering for pinyin output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMode {
    /// Diacritic tone marks (nǐ hǎo)
    #[default]
    Marks,
    /// Trailing tone numbers (ni3 hao3)
    Numbers,
}

impl ToneMode {
    pub fn from_tone_numbers(tone_numbers: bool) -> Self {
        if tone_numbers {
            ToneMode::Numbers
        } else {
            ToneMode::Marks
        }
    }
}

/// Which path produced an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// External transliteration + translation engine
    Primary,
    /// Local transliteration plus generic translation service
    Fallback,
}

/// Annotation output for one chunk
///
/// Both arrays always have the chunk's length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub pinyin: Vec<String>,
    pub english: Vec<String>,
    pub provenance: Provenance,
}

impl AnnotationResult {
    pub fn len(&self) -> usize {
        self.pinyin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pinyin.is_empty()
    }
}

/// Append the fallback marker to an annotation
pub fn tag_fallback(text: &str) -> String {
    format!("{text}{FALLBACK_MARKER}")
}

/// True when an annotation carries the fallback marker
pub fn is_fallback_tagged(text: &str) -> bool {
    text.ends_with(FALLBACK_MARKER)
}

/// Remove the fallback marker, if present
pub fn strip_fallback_tag(text: &str) -> &str {
    text.strip_suffix(FALLBACK_MARKER).unwrap_or(text)
}
