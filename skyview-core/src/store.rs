//! Durable storage for recent searches.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{fmt::Debug, path::PathBuf};

use crate::{
    error::{Result, WeatherError},
    model::RecentSearchEntry,
};

/// Record store behind the recent-searches cache. Every call must be durable
/// when it returns `Ok`.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// All entries in insertion order, oldest first.
    async fn list(&self) -> Result<Vec<RecentSearchEntry>>;

    async fn insert(&self, entry: &RecentSearchEntry) -> Result<()>;

    /// Removes every entry with the same place identity.
    async fn delete(&self, entry: &RecentSearchEntry) -> Result<()>;
}

/// Entries kept as a JSON array in one file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Vec<RecentSearchEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(WeatherError::Store(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            WeatherError::Store(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    async fn write(&self, entries: &[RecentSearchEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                WeatherError::Store(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| WeatherError::Store(format!("Failed to serialize entries: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            WeatherError::Store(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            WeatherError::Store(format!("Failed to replace {}: {e}", self.path.display()))
        })?;

        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn list(&self) -> Result<Vec<RecentSearchEntry>> {
        self.read().await
    }

    async fn insert(&self, entry: &RecentSearchEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read().await?;
        entries.push(entry.clone());
        self.write(&entries).await
    }

    async fn delete(&self, entry: &RecentSearchEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read().await?;
        entries.retain(|e| e.place != entry.place);
        self.write(&entries).await
    }
}

/// Non-durable store, for hosts without a data directory and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<RecentSearchEntry>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self) -> Result<Vec<RecentSearchEntry>> {
        Ok(self.entries.lock().clone())
    }

    async fn insert(&self, entry: &RecentSearchEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn delete(&self, entry: &RecentSearchEntry) -> Result<()> {
        self.entries.lock().retain(|e| e.place != entry.place);
        Ok(())
    }
}
