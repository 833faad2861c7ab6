use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::{Request, Response};

use super::store::{CachePartition, CacheStorage, StoredEntry};

type PartitionMap = HashMap<String, StoredEntry>;

/// Disk-backed partition storage.
///
/// Each partition is one JSON document under the base directory, named
/// `<partition>.json`. Entries survive process restarts, which the browser
/// cache the original design delegated to would otherwise provide.
pub struct DiskStorage {
    base_dir: PathBuf,
    // Serializes load-modify-save cycles across all partition handles.
    io: Arc<Mutex<()>>,
}

impl DiskStorage {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create cache directory: {}", base_dir.display()))?;
        Ok(Self {
            base_dir,
            io: Arc::new(Mutex::new(())),
        })
    }

    fn partition_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", name))
    }
}

fn load_map(path: &Path) -> Result<PartitionMap> {
    if !path.exists() {
        return Ok(PartitionMap::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache partition: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse cache partition: {}", path.display()))
}

fn save_map(path: &Path, map: &PartitionMap) -> Result<()> {
    let contents = serde_json::to_string(map)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write cache partition: {}", path.display()))?;
    Ok(())
}

pub struct DiskPartition {
    name: String,
    path: PathBuf,
    io: Arc<Mutex<()>>,
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>> {
        let path = self.partition_path(name);
        let _guard = self.io.lock().await;
        if !path.exists() {
            save_map(&path, &PartitionMap::new())?;
        }
        Ok(Arc::new(DiskPartition {
            name: name.to_string(),
            path,
            io: self.io.clone(),
        }))
    }

    async fn partition_names(&self) -> Result<Vec<String>> {
        let _guard = self.io.lock().await;
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.base_dir).with_context(|| {
            format!("Failed to list cache directory: {}", self.base_dir.display())
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool> {
        let path = self.partition_path(name);
        let _guard = self.io.lock().await;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to delete cache partition: {}", path.display())
            }),
        }
    }
}

#[async_trait]
impl CachePartition for DiskPartition {
    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        let _guard = self.io.lock().await;
        let mut map = load_map(&self.path)?;
        map.insert(request.cache_key(), StoredEntry::new(response));
        save_map(&self.path, &map)
    }

    async fn put_all(&self, batch: Vec<(Request, Response)>) -> Result<()> {
        let _guard = self.io.lock().await;
        let mut map = load_map(&self.path)?;
        let count = batch.len();
        for (request, response) in batch {
            map.insert(request.cache_key(), StoredEntry::new(response));
        }
        save_map(&self.path, &map)?;
        debug!(partition = %self.name, entries = count, "committed batch to disk partition");
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<StoredEntry>> {
        let _guard = self.io.lock().await;
        let map = load_map(&self.path)?;
        Ok(map.get(&request.cache_key()).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.io.lock().await;
        let map = load_map(&self.path)?;
        Ok(map.keys().cloned().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
