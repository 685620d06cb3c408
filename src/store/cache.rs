//! Durable offline cache for the document listing
//!
//! A read-through cache: populated only as a side effect of successful
//! listing fetches and consulted only when a fetch fails. Entries are keyed
//! `projects_<userId>` and hold the JSON array of the most recent successful
//! result. Writes to the backend never touch this cache.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;
use tokio::fs as tokio_fs;

use super::ProjectRecord;

/// Errors from cache storage backends.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable key/value storage backing the offline cache.
///
/// The host picks the medium; [`FileCacheStore`] is the default shipped
/// implementation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// The listing cache, namespaced per user.
#[derive(Clone)]
pub struct OfflineCache {
    store: Arc<dyn CacheStore>,
}

impl OfflineCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str) -> String {
        format!("projects_{user_id}")
    }

    /// Overwrite the cached listing after a successful remote fetch.
    pub async fn refresh(
        &self,
        user_id: &str,
        records: &[ProjectRecord],
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(records)?;
        self.store.put(&Self::key(user_id), &json).await?;
        debug!("cached {} listing records for {user_id}", records.len());
        Ok(())
    }

    /// Read the cached listing, if one was ever populated.
    ///
    /// Storage failures and corrupt entries degrade to a miss rather than an
    /// error; the caller already has a failure to report.
    pub async fn read(&self, user_id: &str) -> Option<Vec<ProjectRecord>> {
        let key = Self::key(user_id);
        let raw = match self.store.get(&key).await {
            Ok(value) => value?,
            Err(error) => {
                warn!("cache read failed for {key}: {error}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Some(records),
            Err(error) => {
                warn!("discarding corrupt cache entry {key}: {error}");
                None
            }
        }
    }
}

/// File-backed cache store: one JSON file per key under a base directory.
pub struct FileCacheStore {
    base_dir: PathBuf,
}

impl FileCacheStore {
    /// Create a file store rooted at `base_dir`, creating it if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            tokio_fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = tokio_fs::read_to_string(&path).await?;
        Ok(Some(contents))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path(key);
        tokio_fs::write(&path, value).await?;
        Ok(())
    }
}

/// In-memory cache store, for tests and hosts without durable storage.
pub struct MemoryCacheStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
