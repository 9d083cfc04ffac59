//! Stream reconciler
//!
//! Folds decoded [`StreamEvent`]s into a line-aligned [`WorkingState`]. Merging is a pure
//! pass-and-return step ([`merge`]); [`StreamReconciler`] owns the accumulator between events
//! and tracks the generation phase:
//!
//! ```text
//! Idle -> Requesting -> Streaming{AwaitingLyrics | ReceivingChunks} -> Completed | Errored -> Idle
//! ```
//!
//! `hanzi`, `pinyin` and `english` have equal lengths after every merge.

use lyra_common::chunking::chunk_range;
use lyra_common::model::DEFAULT_CHUNK_SIZE;
use lyra_common::romanize::romanize_lines;
use lyra_common::{StreamEvent, ToneMode};
use tracing::{debug, warn};

use crate::store::Song;

/// Client-side accumulator for one song
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingState {
    pub hanzi: Vec<String>,
    pub pinyin: Vec<String>,
    pub english: Vec<String>,
    pub lrc: Option<String>,
    /// True while a generation run is in progress
    pub generating: bool,
}

impl WorkingState {
    /// Seed from a persisted song, padding or truncating annotations to the line count
    pub fn from_song(song: &Song) -> Self {
        let len = song.hanzi.len();
        Self {
            hanzi: song.hanzi.clone(),
            pinyin: aligned(&song.pinyin, len),
            english: aligned(&song.english, len),
            lrc: song.lrc.clone(),
            generating: false,
        }
    }

    /// Persistable copy of this state, keeping the song's identity and metadata
    pub fn snapshot(&self, base: &Song) -> Song {
        Song {
            id: base.id.clone(),
            title: base.title.clone(),
            artist: base.artist.clone(),
            hanzi: self.hanzi.clone(),
            pinyin: self.pinyin.clone(),
            english: self.english.clone(),
            lrc: self.lrc.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.hanzi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hanzi.is_empty()
    }

    pub fn is_aligned(&self) -> bool {
        self.pinyin.len() == self.hanzi.len() && self.english.len() == self.hanzi.len()
    }
}

fn aligned(values: &[String], len: usize) -> Vec<String> {
    let mut out: Vec<String> = values.iter().take(len).cloned().collect();
    out.resize(len, String::new());
    out
}

/// Streaming sub-phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No lines were sent; waiting for discovered lyrics
    AwaitingLyrics,
    ReceivingChunks,
}

/// Generation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Streaming(StreamPhase),
    Completed,
    Errored,
}

/// User-visible message produced by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Informational, e.g. no lyrics found
    Info(String),
    /// Server-reported or read failure
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(message) | Notice::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Parameters shared by every merge of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeContext {
    /// Must match the server's chunk size
    pub chunk_size: usize,
    /// Tone mode for local placeholder pinyin
    pub tone_mode: ToneMode,
}

impl Default for MergeContext {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tone_mode: ToneMode::default(),
        }
    }
}

/// Result of one merge step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub state: WorkingState,
    /// Whether any field changed
    pub changed: bool,
    /// Whether a snapshot must be persisted now
    pub persist: bool,
    pub notice: Option<Notice>,
}

/// Apply one event to `state`
pub fn merge(mut state: WorkingState, event: &StreamEvent, ctx: &MergeContext) -> MergeOutcome {
    let mut notice = None;

    let (changed, persist) = match event {
        StreamEvent::LyricsUpdate { lines } => {
            let pinyin = romanize_lines(lines, ctx.tone_mode);
            let english = vec![String::new(); lines.len()];
            let changed = state.hanzi != *lines || state.pinyin != pinyin || state.english != english;
            state.hanzi = lines.clone();
            state.pinyin = pinyin;
            state.english = english;
            // Discovered lines are always persisted, even when unchanged
            (changed, true)
        }
        StreamEvent::PinyinChunk { chunk_index, data, .. } => {
            let changed = write_chunk(&mut state.pinyin, *chunk_index, data, ctx.chunk_size, "pinyin");
            (changed, changed)
        }
        StreamEvent::English { chunk_index, data, .. } => {
            let changed = write_chunk(&mut state.english, *chunk_index, data, ctx.chunk_size, "english");
            (changed, changed)
        }
        StreamEvent::LrcUpdate { lrc } => {
            let changed = state.lrc.as_deref() != Some(lrc.as_str());
            state.lrc = Some(lrc.clone());
            (changed, true)
        }
        StreamEvent::Info { message } => {
            notice = Some(Notice::Info(message.clone()));
            (false, false)
        }
        StreamEvent::Error { message } => {
            notice = Some(Notice::Error(message.clone()));
            (false, false)
        }
    };

    MergeOutcome {
        state,
        changed,
        persist,
        notice,
    }
}

/// Bounds-checked chunk write; returns whether any slot changed
fn write_chunk(target: &mut [String], chunk_index: usize, data: &[String], size: usize, field: &str) -> bool {
    let range = chunk_range(chunk_index, size, data.len(), target.len());
    let dropped = data.len() - range.len();
    if dropped > 0 {
        warn!(
            field,
            chunk_index,
            dropped,
            len = target.len(),
            "Chunk data out of range, dropping excess entries"
        );
    }

    let mut changed = false;
    for (slot, value) in target[range].iter_mut().zip(data) {
        if slot != value {
            slot.clone_from(value);
            changed = true;
        }
    }
    changed
}

/// Phase-tracking owner of the working state for one song
#[derive(Debug)]
pub struct StreamReconciler {
    state: WorkingState,
    phase: Phase,
    ctx: MergeContext,
    notice: Option<Notice>,
}

impl StreamReconciler {
    pub fn new(state: WorkingState, ctx: MergeContext) -> Self {
        Self {
            state,
            phase: Phase::Idle,
            ctx,
            notice: None,
        }
    }

    pub fn state(&self) -> &WorkingState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn into_state(self) -> WorkingState {
        self.state
    }

    /// Idle -> Requesting
    pub fn begin(&mut self) {
        if self.phase != Phase::Idle {
            warn!(phase = ?self.phase, "Starting a run from a non-idle phase");
        }
        self.phase = Phase::Requesting;
        self.notice = None;
        self.state.generating = true;
    }

    /// Requesting -> Streaming, once response headers arrived
    pub fn stream_opened(&mut self, expect_lyrics: bool) {
        self.phase = Phase::Streaming(if expect_lyrics {
            StreamPhase::AwaitingLyrics
        } else {
            StreamPhase::ReceivingChunks
        });
    }

    /// Merge one event, returning the outcome flags (the state stays inside)
    pub fn apply(&mut self, event: &StreamEvent) -> (bool, bool) {
        let state = std::mem::take(&mut self.state);
        let outcome = merge(state, event, &self.ctx);
        self.state = outcome.state;

        match event {
            StreamEvent::LyricsUpdate { .. } | StreamEvent::PinyinChunk { .. } | StreamEvent::English { .. } => {
                self.phase = Phase::Streaming(StreamPhase::ReceivingChunks);
            }
            _ => {}
        }

        if let Some(notice) = outcome.notice {
            debug!(notice = notice.message(), "Stream notice");
            self.notice = Some(notice);
        }

        (outcome.changed, outcome.persist)
    }

    /// Streaming -> Completed
    pub fn complete(&mut self) {
        self.phase = Phase::Completed;
        self.state.generating = false;
    }

    /// Any -> Errored; merged state is kept
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = Phase::Errored;
        self.notice = Some(Notice::Error(message.into()));
        self.state.generating = false;
    }

    /// Completed | Errored -> Idle
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.notice = None;
        self.state.generating = false;
    }
}
