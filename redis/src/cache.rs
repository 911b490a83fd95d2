//! In-process read-through cache for listings.

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use turnstile_core::adapter::Cache;
use turnstile_core::{Error, Result};

/// Entries beyond this trigger an eager purge of expired values on write.
const PURGE_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

/// Client-side TTL cache for listing reads (events, available-seat
/// snapshots, queue lengths).
///
/// Values are stored serialized so a cached read observes the same shape
/// as a store read. Inventory decisions never consult this cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryListingCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryListingCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryListingCache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let value = serde_json::from_str(&entry.data)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let data = serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
        let ttl = ttl.to_std().unwrap_or_default();

        let mut entries = self.entries.write().await;
        if entries.len() >= PURGE_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_values() {
        let cache = MemoryListingCache::new();
        cache
            .set("lengths:e1", &42u64, Duration::seconds(30))
            .await
            .unwrap();

        let cached: Option<u64> = cache.get("lengths:e1").await.unwrap();
        assert_eq!(cached, Some(42));
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = MemoryListingCache::new();
        cache
            .set("lengths:e1", &42u64, Duration::zero())
            .await
            .unwrap();

        let cached: Option<u64> = cache.get("lengths:e1").await.unwrap();
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn delete_invalidates() {
        let cache = MemoryListingCache::new();
        cache
            .set("lengths:e1", &1u64, Duration::seconds(30))
            .await
            .unwrap();
        cache.delete("lengths:e1").await.unwrap();

        let cached: Option<u64> = cache.get("lengths:e1").await.unwrap();
        assert_eq!(cached, None);
    }
}
