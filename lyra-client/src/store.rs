//! Song store
//!
//! Songs are keyed by id. The three line arrays are stored as JSON text columns next to the
//! synced lyrics blob, so a snapshot is always written as one row.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::error::StoreError;

/// Persisted song
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub hanzi: Vec<String>,
    pub pinyin: Vec<String>,
    pub english: Vec<String>,
    pub lrc: Option<String>,
}

impl Song {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// True when at least one line is non-blank
    pub fn has_lines(&self) -> bool {
        self.hanzi.iter().any(|line| !line.trim().is_empty())
    }

    /// Metadata present but no line content
    pub fn is_zombie(&self) -> bool {
        let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        has_title && !self.has_lines()
    }
}

/// Keyed song persistence
#[async_trait]
pub trait SongStore: Send + Sync {
    /// Insert or overwrite the song with `song.id`
    async fn upsert(&self, song: &Song) -> Result<(), StoreError>;

    async fn load(&self, id: &str) -> Result<Option<Song>, StoreError>;
}

/// SQLite-backed store
pub struct SqliteSongStore {
    pool: SqlitePool,
}

type SongRow = (String, Option<String>, Option<String>, String, String, String, Option<String>);

impl SqliteSongStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&db_url).await?;

        if newly_created {
            info!("Initialized new song database: {}", db_path.display());
        } else {
            info!("Opened existing song database: {}", db_path.display());
        }

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// Private in-memory database (single connection, so every query sees the same data)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                id TEXT PRIMARY KEY,
                title TEXT,
                artist TEXT,
                hanzi TEXT NOT NULL DEFAULT '[]',
                pinyin TEXT NOT NULL DEFAULT '[]',
                english TEXT NOT NULL DEFAULT '[]',
                lrc TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SongStore for SqliteSongStore {
    async fn upsert(&self, song: &Song) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO songs (id, title, artist, hanzi, pinyin, english, lrc, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                hanzi = excluded.hanzi,
                pinyin = excluded.pinyin,
                english = excluded.english,
                lrc = excluded.lrc,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&song.id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(serde_json::to_string(&song.hanzi)?)
        .bind(serde_json::to_string(&song.pinyin)?)
        .bind(serde_json::to_string(&song.english)?)
        .bind(&song.lrc)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Song>, StoreError> {
        let row: Option<SongRow> = sqlx::query_as(
            "SELECT id, title, artist, hanzi, pinyin, english, lrc FROM songs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, title, artist, hanzi, pinyin, english, lrc)) = row else {
            return Ok(None);
        };

        Ok(Some(Song {
            id,
            title,
            artist,
            hanzi: serde_json::from_str(&hanzi)?,
            pinyin: serde_json::from_str(&pinyin)?,
            english: serde_json::from_str(&english)?,
            lrc,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zombie_detection() {
        let mut song = Song::new("s1");
        assert!(!song.is_zombie(), "no metadata");

        song.title = Some("月亮代表我的心".to_string());
        assert!(song.is_zombie());

        song.hanzi = vec!["  ".to_string()];
        assert!(song.is_zombie(), "whitespace lines do not count");

        song.hanzi.push("你问我爱你有多深".to_string());
        assert!(!song.is_zombie());
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = SqliteSongStore::in_memory().await.unwrap();
        let song = Song {
            id: "s1".to_string(),
            title: Some("t".to_string()),
            artist: None,
            hanzi: vec!["你好".to_string(), String::new()],
            pinyin: vec!["nǐ hǎo".to_string(), String::new()],
            english: vec!["hello".to_string(), String::new()],
            lrc: Some("[00:01.00]你好".to_string()),
        };

        store.upsert(&song).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), Some(song));
        assert_eq!(store.load("missing").await.unwrap(), None);
    }
}
