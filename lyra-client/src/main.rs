//! lyra-client - Lyric annotation client
//!
//! Generates (or regenerates) one song against a running lyra-annotate service and stores the
//! result in the local song database.

use anyhow::{bail, Context, Result};
use clap::Parser;
use lyra_client::config::ClientConfig;
use lyra_client::{ClientSession, HttpTransport, Song, SongStore, SqliteSongStore};
use lyra_common::config::{load_config, resolve_config_path, LoadedConfig};
use lyra_common::ToneMode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lyra-client", version, about = "Generate pinyin and English for a song")]
struct Args {
    /// Path to lyra-client.toml
    #[arg(long, env = "LYRA_CONFIG")]
    config: Option<PathBuf>,

    /// Annotation service base URL
    #[arg(long, env = "LYRA_SERVER")]
    server: Option<String>,

    /// Song database path
    #[arg(long, env = "LYRA_DB")]
    db: Option<PathBuf>,

    /// Song id (a new id is generated when omitted)
    #[arg(long)]
    song: Option<String>,

    /// Song title (stored, and used to discover lyrics)
    #[arg(long)]
    title: Option<String>,

    /// Song artist
    #[arg(long)]
    artist: Option<String>,

    /// Read lines from this file instead of the stored ones
    #[arg(long)]
    lines: Option<PathBuf>,

    /// Pinyin with tone numbers instead of tone marks
    #[arg(long)]
    tone_numbers: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path("lyra-client", args.config.as_deref());
    let LoadedConfig { config, source } = load_config::<ClientConfig>(config_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting lyra-client v{}", env!("CARGO_PKG_VERSION"));
    source.log();

    let server = args.server.unwrap_or_else(|| config.server.url.clone());
    let db_path = args.db.unwrap_or_else(|| config.store.resolved_path());
    let tone_mode = ToneMode::from_tone_numbers(args.tone_numbers || config.generation.tone_numbers);

    let store = Arc::new(
        SqliteSongStore::open(&db_path)
            .await
            .with_context(|| format!("Failed to open song database {}", db_path.display()))?,
    );

    let song_id = args.song.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut song = store
        .load(&song_id)
        .await
        .context("Failed to load song")?
        .unwrap_or_else(|| Song::new(&song_id));

    if args.title.is_some() {
        song.title = args.title;
    }
    if args.artist.is_some() {
        song.artist = args.artist;
    }
    if let Some(path) = &args.lines {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lines from {}", path.display()))?;
        song.hanzi = text.lines().map(|line| line.trim_end().to_string()).collect();
        song.pinyin.clear();
        song.english.clear();
    }

    if !song.has_lines() && song.title.is_none() {
        bail!("Nothing to annotate: song {} has no lines and no title", song.id);
    }

    let transport = HttpTransport::new(&server).context("Failed to create HTTP transport")?;
    let session = ClientSession::new(Arc::new(transport), store)
        .with_chunk_size(config.generation.chunk_size);

    info!(song_id = %song.id, server = %server, db = %db_path.display(), "Generating");

    let outcome = if song.is_zombie() {
        match session.auto_generate(song, tone_mode).await? {
            Some(outcome) => outcome,
            None => return Ok(()),
        }
    } else {
        session.generate(song, tone_mode).await?
    };

    println!("song: {}", outcome.song.id);
    for ((hanzi, pinyin), english) in outcome
        .song
        .hanzi
        .iter()
        .zip(&outcome.song.pinyin)
        .zip(&outcome.song.english)
    {
        if hanzi.trim().is_empty() {
            println!();
            continue;
        }
        println!("{hanzi}\n  {pinyin}\n  {english}");
    }

    if let Some(notice) = &outcome.notice {
        println!("[{}] {}", if notice.is_error() { "error" } else { "info" }, notice.message());
    }

    if !outcome.is_complete() {
        bail!("Generation ended early ({:?})", outcome.phase);
    }

    Ok(())
}
