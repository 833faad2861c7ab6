use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Request, Response};

use super::store::{CachePartition, CacheStorage, StoredEntry};

type PartitionMap = HashMap<String, StoredEntry>;

/// In-memory partition storage.
///
/// The default backend for tests and for hosts that rely on the process
/// staying alive. Clone is cheap; all clones share the same partitions.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    partitions: Arc<RwLock<HashMap<String, Arc<RwLock<PartitionMap>>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryPartition {
    name: String,
    entries: Arc<RwLock<PartitionMap>>,
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>> {
        let mut partitions = self.partitions.write().await;
        let entries = partitions
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(PartitionMap::new())))
            .clone();
        Ok(Arc::new(MemoryPartition {
            name: name.to_string(),
            entries,
        }))
    }

    async fn partition_names(&self) -> Result<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.keys().cloned().collect())
    }

    async fn delete_partition(&self, name: &str) -> Result<bool> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions.remove(name).is_some())
    }
}

#[async_trait]
impl CachePartition for MemoryPartition {
    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(request.cache_key(), StoredEntry::new(response));
        Ok(())
    }

    async fn put_all(&self, batch: Vec<(Request, Response)>) -> Result<()> {
        // Single write lock so the whole batch lands as one commit.
        let mut entries = self.entries.write().await;
        let count = batch.len();
        for (request, response) in batch {
            entries.insert(request.cache_key(), StoredEntry::new(response));
        }
        debug!(partition = %self.name, entries = count, "committed batch to memory partition");
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<StoredEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&request.cache_key()).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
