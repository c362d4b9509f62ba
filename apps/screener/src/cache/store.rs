//! Durable key → ExtractedText stores backing the extraction cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::extraction::ExtractedText;
use crate::models::document::Fingerprint;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// get/put persistence for extracted text, keyed by fingerprint.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &Fingerprint) -> Result<Option<ExtractedText>, StoreError>;

    async fn put(&self, key: &Fingerprint, value: &ExtractedText) -> Result<(), StoreError>;

    /// Persists anything still buffered. Called once at shutdown.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Filesystem store: one JSON file per fingerprint
// ────────────────────────────────────────────────────────────────────────────

/// Keyed files under a directory: `<dir>/<fingerprint>.json`.
/// Writes go to a temporary file first and are renamed into place.
pub struct FsCacheStore {
    dir: PathBuf,
}

impl FsCacheStore {
    /// Creates the directory if needed and reports how many entries are already present.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut entries = 0usize;
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.path().extension().is_some_and(|e| e == "json") {
                entries += 1;
            }
        }
        info!(
            "Extraction cache opened at {} ({entries} persisted entries)",
            dir.display()
        );

        Ok(Self { dir })
    }

    fn path_for(&self, key: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, key: &Fingerprint) -> Result<Option<ExtractedText>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &Fingerprint, value: &ExtractedText) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(value)?;
        let tmp = self.dir.join(format!("{key}.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, self.path_for(key)).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis store
// ────────────────────────────────────────────────────────────────────────────

const REDIS_KEY_PREFIX: &str = "screener:extraction:";

pub struct RedisCacheStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisCacheStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Extraction cache connected to Redis");
        Ok(Self { conn })
    }

    fn key(fingerprint: &Fingerprint) -> String {
        format!("{REDIS_KEY_PREFIX}{fingerprint}")
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &Fingerprint) -> Result<Option<ExtractedText>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(key)).await?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn put(&self, key: &Fingerprint, value: &ExtractedText) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(value)?;
        conn.set::<_, _, ()>(Self::key(key), raw).await?;
        Ok(())
    }
}
