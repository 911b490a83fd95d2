//! Shared Redis connection handle.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use turnstile_core::{Error, Result};

/// Map a driver error onto the caller-visible taxonomy.
///
/// Semantic failures (state-machine rejections, missing entities) are
/// produced by the scripts themselves; anything surfacing as a raw driver
/// error is transient by definition.
pub(crate) fn store_err(err: redis::RedisError) -> Error {
    Error::StoreUnavailable(err.to_string())
}

pub(crate) fn encode_err(err: serde_json::Error) -> Error {
    Error::Serialization(err.to_string())
}

/// Shared Redis handle used by every repository and the lock.
///
/// Wraps a [`ConnectionManager`]: clones share the underlying multiplexed
/// connection and reconnect transparently.
#[derive(Clone)]
pub struct RedisStore {
    conn_manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - connection URL, e.g. `"redis://127.0.0.1:6379"`
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the client cannot be created or the
    /// initial connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(store_err)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(store_err)?;
        Ok(Self { conn_manager })
    }

    /// A connection handle for one operation.
    pub(crate) fn conn(&self) -> ConnectionManager {
        self.conn_manager.clone()
    }

    /// Load and decode a JSON entity. `Ok(None)` when the key is absent.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn();
        let raw: Option<String> = conn.get(key).await.map_err(store_err)?;
        match raw {
            Some(data) => Ok(Some(serde_json::from_str(&data).map_err(encode_err)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a JSON entity.
    pub(crate) async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string(value).map_err(encode_err)?;
        let mut conn = self.conn();
        let _: () = conn.set(key, data).await.map_err(store_err)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}
