//! Persistence for the video collection.
//!
//! The collection is always read and written as a whole. Both operations
//! swallow failures after logging them: a store that cannot be read looks
//! empty, and a store that cannot be written keeps its previous contents.

use anyhow::Context;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::models::Video;

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Read the full collection. Never fails; problems are logged.
    async fn load(&self) -> Vec<Video>;

    /// Overwrite the full collection. Never fails; problems are logged.
    async fn save(&self, videos: &[Video]);
}

/// Stores the collection as a pretty-printed JSON array in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn try_save(&self, videos: &[Video]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(videos).context("Failed to serialize videos")?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {:?}", self.path));
        }

        Ok(())
    }
}

#[async_trait]
impl VideoStore for JsonFileStore {
    async fn load(&self) -> Vec<Video> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[store] {:?} does not exist yet, starting empty", self.path);
                return Vec::new();
            }
            Err(e) => {
                error!("[store] ❌ Error reading data file {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("[store] ❌ Error parsing data file {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        // Skip unreadable records rather than the whole file.
        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Video>(record) {
                Ok(video) => Some(video),
                Err(e) => {
                    warn!("[store] ⚠️  Skipping record {} in {:?}: {}", index, self.path, e);
                    None
                }
            })
            .collect()
    }

    async fn save(&self, videos: &[Video]) {
        match self.try_save(videos).await {
            Ok(()) => info!("[store] ✅ Wrote {} videos to {:?}", videos.len(), self.path),
            Err(e) => error!("[store] ❌ Error writing data file: {:#}", e),
        }
    }
}

/// Keeps the collection in process memory only.
#[derive(Default)]
pub struct MemoryStore {
    videos: RwLock<Vec<Video>>,
}

impl MemoryStore {
    pub fn new(videos: Vec<Video>) -> Self {
        Self {
            videos: RwLock::new(videos),
        }
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn load(&self) -> Vec<Video> {
        self.videos.read().await.clone()
    }

    async fn save(&self, videos: &[Video]) {
        *self.videos.write().await = videos.to_vec();
    }
}
