//! Client session: generation runs with guards and background persistence
//!
//! A session allows one in-flight generation per song id, and auto-generates a zombie song
//! (metadata but no lines) at most once. Snapshots are handed to a writer task in merge order
//! without waiting on the store: when the queue is full an intermediate snapshot is skipped,
//! since each snapshot carries the full state. A failed write is logged and never interrupts the
//! read loop.

use futures::StreamExt;
use lyra_common::api::{AnnotateOptions, AnnotateRequest};
use lyra_common::events::ndjson::NdjsonDecoder;
use lyra_common::{StreamEvent, ToneMode};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::reconciler::{MergeContext, Notice, Phase, StreamReconciler, WorkingState};
use crate::store::{Song, SongStore};
use crate::transport::{AnnotateTransport, ByteStream};

const PERSIST_QUEUE: usize = 64;

/// Registry of songs with a generation in flight
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    songs: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Claim `song_id`; `None` when a run already holds it
    pub fn try_acquire(&self, song_id: &str) -> Option<GenerationToken> {
        let mut songs = self.songs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !songs.insert(song_id.to_string()) {
            return None;
        }
        Some(GenerationToken {
            song_id: song_id.to_string(),
            songs: self.songs.clone(),
        })
    }

    pub fn contains(&self, song_id: &str) -> bool {
        self.songs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(song_id)
    }
}

/// Releases the song's in-flight claim on drop
#[derive(Debug)]
pub struct GenerationToken {
    song_id: String,
    songs: Arc<Mutex<HashSet<String>>>,
}

impl Drop for GenerationToken {
    fn drop(&mut self) {
        self.songs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.song_id);
    }
}

/// Ordered snapshot writer
struct Persister {
    tx: mpsc::Sender<Song>,
    handle: JoinHandle<()>,
}

impl Persister {
    fn spawn(store: Arc<dyn SongStore>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Song>(PERSIST_QUEUE);

        let handle = tokio::spawn(async move {
            while let Some(song) = rx.recv().await {
                match store.upsert(&song).await {
                    Ok(()) => debug!(song_id = %song.id, lines = song.hanzi.len(), "Snapshot persisted"),
                    Err(e) => error!(song_id = %song.id, error = %e, "Failed to persist snapshot"),
                }
            }
        });

        Self { tx, handle }
    }

    /// Queue an intermediate snapshot without waiting
    fn offer(&self, song: Song) {
        match self.tx.try_send(song) {
            Ok(()) => {}
            Err(TrySendError::Full(song)) => {
                warn!(song_id = %song.id, "Snapshot queue full, skipping intermediate snapshot")
            }
            Err(TrySendError::Closed(song)) => {
                error!(song_id = %song.id, "Snapshot writer stopped, dropping snapshot")
            }
        }
    }

    /// Queue the final snapshot, waiting for room
    async fn submit(&self, song: Song) {
        if let Err(e) = self.tx.send(song).await {
            error!(song_id = %e.0.id, "Snapshot writer stopped, dropping snapshot");
        }
    }

    /// Wait until every queued snapshot was written
    async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Snapshot writer task failed");
        }
    }
}

/// Result of one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Final snapshot (also persisted)
    pub song: Song,
    /// `Completed` or `Errored`
    pub phase: Phase,
    pub notice: Option<Notice>,
    /// Decoded events
    pub events: usize,
}

impl GenerationOutcome {
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Long-lived client session
pub struct ClientSession {
    transport: Arc<dyn AnnotateTransport>,
    store: Arc<dyn SongStore>,
    chunk_size: usize,
    in_flight: InFlight,
    zombie_attempts: Mutex<HashSet<String>>,
}

impl ClientSession {
    pub fn new(transport: Arc<dyn AnnotateTransport>, store: Arc<dyn SongStore>) -> Self {
        Self {
            transport,
            store,
            chunk_size: lyra_common::model::DEFAULT_CHUNK_SIZE,
            in_flight: InFlight::default(),
            zombie_attempts: Mutex::new(HashSet::new()),
        }
    }

    /// Chunk size used for write ranges (must match the server)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Generate a zombie song once per session; `None` for non-zombies and repeat attempts
    pub async fn auto_generate(&self, song: Song, tone_mode: ToneMode) -> ClientResult<Option<GenerationOutcome>> {
        if !song.is_zombie() {
            return Ok(None);
        }

        // A busy song keeps its attempt for later
        let token = self.claim(&song.id)?;

        let first_attempt = self
            .zombie_attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(song.id.clone());
        if !first_attempt {
            info!(song_id = %song.id, "Zombie song already attempted this session, skipping");
            return Ok(None);
        }

        info!(song_id = %song.id, title = ?song.title, "Auto-generating song without lines");
        Ok(Some(self.run(song, tone_mode, token).await))
    }

    /// Run one generation for `song`
    ///
    /// Fails only when the song is already generating. Stream failures end the run in
    /// `Phase::Errored` with everything merged so far persisted.
    pub async fn generate(&self, song: Song, tone_mode: ToneMode) -> ClientResult<GenerationOutcome> {
        let token = self.claim(&song.id)?;
        Ok(self.run(song, tone_mode, token).await)
    }

    fn claim(&self, song_id: &str) -> ClientResult<GenerationToken> {
        self.in_flight
            .try_acquire(song_id)
            .ok_or_else(|| ClientError::Busy(song_id.to_string()))
    }

    async fn run(&self, song: Song, tone_mode: ToneMode, _token: GenerationToken) -> GenerationOutcome {
        let request = AnnotateRequest {
            hanzi_lines: song.has_lines().then(|| song.hanzi.clone()),
            title: song.title.clone(),
            artist: song.artist.clone(),
            options: Some(AnnotateOptions {
                tone_numbers: tone_mode == ToneMode::Numbers,
            }),
        };
        let expect_lyrics = request.hanzi_lines.is_none();

        let ctx = MergeContext {
            chunk_size: self.chunk_size,
            tone_mode,
        };
        let mut reconciler = StreamReconciler::new(WorkingState::from_song(&song), ctx);
        reconciler.begin();

        info!(
            song_id = %song.id,
            lines = song.hanzi.len(),
            expect_lyrics,
            "Starting generation"
        );

        let persister = Persister::spawn(self.store.clone());
        let mut events = 0;

        let result = match self.transport.open(&request).await {
            Ok(stream) => {
                reconciler.stream_opened(expect_lyrics);
                consume(stream, &mut reconciler, &persister, &song, &mut events).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                reconciler.complete();
                info!(song_id = %song.id, events, lines = reconciler.state().len(), "Generation complete");
            }
            Err(e) => {
                warn!(song_id = %song.id, events, error = %e, "Generation stream failed, keeping partial state");
                reconciler.fail(e.to_string());
            }
        }

        let snapshot = reconciler.state().snapshot(&song);
        persister.submit(snapshot.clone()).await;
        persister.close().await;

        GenerationOutcome {
            song: snapshot,
            phase: reconciler.phase(),
            notice: reconciler.notice().cloned(),
            events,
        }
    }
}

/// Sequential read loop: decode, merge, queue snapshots
async fn consume(
    mut stream: ByteStream,
    reconciler: &mut StreamReconciler,
    persister: &Persister,
    song: &Song,
    events: &mut usize,
) -> ClientResult<()> {
    let mut decoder = NdjsonDecoder::new();

    while let Some(read) = stream.next().await {
        let bytes = read?;
        for decoded in decoder.push(&bytes) {
            let event = decoded?;
            apply_event(&event, reconciler, persister, song);
            *events += 1;
        }
    }

    if let Some(decoded) = decoder.finish() {
        let event = decoded?;
        apply_event(&event, reconciler, persister, song);
        *events += 1;
    }

    Ok(())
}

fn apply_event(event: &StreamEvent, reconciler: &mut StreamReconciler, persister: &Persister, song: &Song) {
    let (changed, persist) = reconciler.apply(event);
    debug!(
        event = event.event_type(),
        chunk_index = ?event.chunk_index(),
        changed,
        "Merged stream event"
    );

    if persist {
        persister.offer(reconciler.state().snapshot(song));
    }
}
