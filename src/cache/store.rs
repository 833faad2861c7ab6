use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Request, Response};

/// A response as stored in a partition, with the time it was cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }
}

/// A single named cache partition.
#[async_trait]
pub trait CachePartition: Send + Sync {
    /// Store one response under the request's identity key, overwriting any
    /// existing entry for the same key.
    async fn put(&self, request: &Request, response: Response) -> Result<()>;

    /// Store a batch of responses as a single commit. Install uses this so a
    /// partition is never left with a half-committed population.
    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<()>;

    /// Look up a request by identity key (method + URL).
    async fn match_request(&self, request: &Request) -> Result<Option<StoredEntry>>;

    /// Identity keys of all entries in the partition.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// A collection of named cache partitions.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>>;

    /// Names of all existing partitions.
    async fn partition_names(&self) -> Result<Vec<String>>;

    /// Delete a whole partition. Returns whether it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stored_entry_age_minutes() {
        let entry = StoredEntry::new(Response::ok("body"));
        assert!(entry.age_minutes() <= 1);

        let mut old = StoredEntry::new(Response::ok("body"));
        old.cached_at = Utc::now() - Duration::minutes(90);
        assert!(old.age_minutes() >= 90);
    }
}
