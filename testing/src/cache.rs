//! In-memory cache.

use crate::guard;
use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use turnstile_core::adapter::Cache;
use turnstile_core::{Error, Result};

/// TTL cache over serialized values, mirroring the production listing
/// cache closely enough that cached and uncached reads are
/// indistinguishable to the services.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entries = guard(&self.entries)?;
        match entries.get(key) {
            Some((data, expires_at)) if *expires_at > Instant::now() => {
                let value =
                    serde_json::from_str(data).map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let data = serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
        guard(&self.entries)?.insert(
            key.to_string(),
            (data, Instant::now() + ttl.to_std().unwrap_or_default()),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        guard(&self.entries)?.remove(key);
        Ok(())
    }
}
