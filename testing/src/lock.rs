//! In-memory per-key mutex.

use crate::guard;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use turnstile_core::adapter::Lock;
use turnstile_core::Result;

/// TTL-aware in-memory lock with the same try-lock semantics as the
/// store-backed mutex: an expired lease is free for the next taker.
#[derive(Debug, Clone, Default)]
pub struct MemoryLock {
    leases: Arc<Mutex<HashMap<String, Instant>>>,
}

impl MemoryLock {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lock for MemoryLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut leases = guard(&self.leases)?;
        let now = Instant::now();

        if let Some(expires_at) = leases.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        leases.insert(key.to_string(), now + ttl.to_std().unwrap_or_default());
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        guard(&self.leases)?.remove(key);
        Ok(())
    }

    async fn extend(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut leases = guard(&self.leases)?;
        if leases.contains_key(key) {
            leases.insert(key.to_string(), Instant::now() + ttl.to_std().unwrap_or_default());
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let leases = guard(&self.leases)?;
        Ok(leases
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let lock = MemoryLock::new();
        assert!(lock.acquire("r", Duration::seconds(5)).await.unwrap());
        assert!(!lock.acquire("r", Duration::seconds(5)).await.unwrap());

        lock.release("r").await.unwrap();
        assert!(lock.acquire("r", Duration::seconds(5)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_is_free() {
        let lock = MemoryLock::new();
        assert!(lock.acquire("r", Duration::zero()).await.unwrap());
        assert!(lock.acquire("r", Duration::seconds(5)).await.unwrap());
    }
}
