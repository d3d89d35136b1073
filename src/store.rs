//! Shared storage primitive
//!
//! Every Privacore collection is an in-memory `Vec` behind a tokio `RwLock`,
//! optionally mirrored to one JSON file per record under a directory:
//!
//! ```text
//! <state-dir>/
//! ├── detections/
//! │   ├── det-<uuid>.json
//! │   └── ...
//! ├── incidents/
//! └── ...
//! ```
//!
//! Persistence writes are awaited and surface [`Error::Storage`]. Callers
//! persist before committing to the in-memory view, so a failed write leaves
//! no record behind.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory record collection with optional JSON file persistence
pub struct JsonCollection<T> {
    dir: Option<PathBuf>,
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for JsonCollection<T> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: Clone + Serialize + DeserializeOwned> JsonCollection<T> {
    /// Open a collection. `None` keeps records in memory only; `Some(dir)`
    /// loads every `*.json` record under `dir` and mirrors writes there.
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        let items = match &dir {
            Some(d) => {
                tokio::fs::create_dir_all(d)
                    .await
                    .map_err(|e| Error::Storage(format!("Failed to create {}: {}", d.display(), e)))?;
                load_json_files(d)
            }
            None => Vec::new(),
        };

        Ok(Self {
            dir,
            items: Arc::new(RwLock::new(items)),
        })
    }

    /// Memory-only collection
    pub fn memory() -> Self {
        Self {
            dir: None,
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Shared read access to the records
    pub async fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().await
    }

    /// Exclusive access to the records
    pub async fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().await
    }

    /// Write one record's JSON file. No-op when memory-only.
    pub async fn persist(&self, id: &str, item: &T) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(item)?;
        let path = dir.join(format!("{}.json", id));
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::Storage(format!("Failed to persist {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Persist then append a new record
    pub async fn append(&self, id: &str, item: T) -> Result<()> {
        let mut items = self.items.write().await;
        self.persist(id, &item).await?;
        items.push(item);
        Ok(())
    }
}

/// Load all JSON files from a directory into a Vec
fn load_json_files<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    let mut items = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
            }
            return items;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
            }
        }
    }

    items
}
