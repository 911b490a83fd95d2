//! Store-backed per-key mutex.

use crate::client::{store_err, RedisStore};
use crate::keys;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use turnstile_core::adapter::Lock;
use turnstile_core::{Error, Result};
use uuid::Uuid;

/// Release only if this holder's token still owns the key. A lease the
/// TTL already evicted (and possibly re-granted to someone else) is left
/// alone.
const RELEASE_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    else
        return 0
    end
"#;

const EXTEND_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('EXPIRE', KEYS[1], ARGV[2])
    else
        return 0
    end
"#;

/// Redis mutex: `SET NX EX` with a per-acquisition holder token.
///
/// The token makes release and extend holder-guarded: a flow whose lease
/// expired mid-way cannot delete the lock a competing flow now holds.
#[derive(Clone)]
pub struct RedisLock {
    store: RedisStore,
    /// Tokens of the leases this process currently holds, by lock key.
    tokens: Arc<Mutex<HashMap<String, String>>>,
}

impl RedisLock {
    /// Create a lock adapter over a shared store handle.
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self {
            store,
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn remember_token(&self, key: &str, token: String) -> Result<()> {
        self.tokens
            .lock()
            .map_err(|_| Error::StoreUnavailable("lock token table poisoned".into()))?
            .insert(key.to_string(), token);
        Ok(())
    }

    fn take_token(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| Error::StoreUnavailable("lock token table poisoned".into()))?
            .remove(key))
    }

    fn peek_token(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| Error::StoreUnavailable("lock token table poisoned".into()))?
            .get(key)
            .cloned())
    }
}

impl Lock for RedisLock {
    async fn acquire(&self, key: &str, ttl: chrono::Duration) -> Result<bool> {
        let lock_key = keys::lock(key);
        let token = Uuid::new_v4().to_string();
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        let mut conn = self.store.conn();
        let outcome: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        let acquired = outcome.as_deref() == Some("OK");
        if acquired {
            self.remember_token(&lock_key, token)?;
            tracing::debug!(key = %key, ttl_seconds, "acquired lock");
        }
        Ok(acquired)
    }

    async fn release(&self, key: &str) -> Result<()> {
        let lock_key = keys::lock(key);
        let Some(token) = self.take_token(&lock_key)? else {
            return Ok(());
        };

        let mut conn = self.store.conn();
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&lock_key)
            .arg(&token)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if deleted == 0 {
            tracing::warn!(key = %key, "lock lease already evicted at release");
        }
        Ok(())
    }

    async fn extend(&self, key: &str, ttl: chrono::Duration) -> Result<()> {
        let lock_key = keys::lock(key);
        let Some(token) = self.peek_token(&lock_key)? else {
            return Ok(());
        };

        let mut conn = self.store.conn();
        let extended: i64 = redis::Script::new(EXTEND_SCRIPT)
            .key(&lock_key)
            .arg(&token)
            .arg(ttl.num_seconds().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if extended == 0 {
            tracing::warn!(key = %key, "lock lease already evicted at extend");
        }
        Ok(())
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let lock_key = keys::lock(key);
        let mut conn = self.store.conn();
        let exists: bool = conn.exists(&lock_key).await.map_err(store_err)?;
        Ok(exists)
    }
}
