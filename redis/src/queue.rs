//! Redis admission-queue repository.

use crate::client::{encode_err, store_err, RedisStore};
use crate::keys;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;
use turnstile_core::domain::{EventId, QueueEntry, QueueStatus, UserId};
use turnstile_core::repository::QueueRepository;
use turnstile_core::{Error, Result};
use uuid::Uuid;

/// Admission-queue storage: per-event FIFO list, entry bodies, session
/// bindings, and the Active-entry expiry index.
///
/// Position assignment (`LLEN` + `RPUSH`) and head promotion (`LPOP` +
/// `LINDEX`) are only correct under the coordinator's per-event
/// `queue_join` / `queue_process` mutexes; this repository does not take
/// locks of its own.
#[derive(Debug, Clone)]
pub struct RedisQueueRepository {
    store: RedisStore,
}

impl RedisQueueRepository {
    /// Create a repository over a shared store handle.
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }

    async fn load_entry(&self, entry_key: &str) -> Result<QueueEntry> {
        self.store
            .get_json(entry_key)
            .await?
            .ok_or(Error::NotFound {
                entity: "queue entry",
            })
    }

    /// Persist an entry and keep the expiry index in step.
    async fn persist(&self, entry: &QueueEntry) -> Result<()> {
        let entry_key = keys::queue_entry(entry.event_id, entry.user_id);
        let data = serde_json::to_string(entry).map_err(encode_err)?;
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic().set(&entry_key, data).ignore();
        match (entry.status, entry.expires_at) {
            (QueueStatus::Active, Some(expires_at)) => {
                pipe.zadd(keys::QUEUE_ACTIVE_EXPIRY, &entry_key, expires_at.timestamp())
                    .ignore();
            }
            _ => {
                pipe.zrem(keys::QUEUE_ACTIVE_EXPIRY, &entry_key).ignore();
            }
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(())
    }
}

impl QueueRepository for RedisQueueRepository {
    async fn join(
        &self,
        event_id: EventId,
        user_id: UserId,
        session_id: &str,
        active_limit: usize,
        active_ttl: Duration,
    ) -> Result<QueueEntry> {
        let entry_key = keys::queue_entry(event_id, user_id);

        // Idempotent per user: a live entry wins over a re-join.
        if let Some(existing) = self.store.get_json::<QueueEntry>(&entry_key).await? {
            if !existing.is_terminal() {
                tracing::debug!(
                    event_id = %event_id,
                    user_id = %user_id,
                    position = existing.position,
                    "join returned existing entry"
                );
                return Ok(existing);
            }
        }

        let mut conn = self.store.conn();
        let length: u64 = conn.llen(keys::queue(event_id)).await.map_err(store_err)?;
        let position: u64 = conn
            .incr(keys::queue_position_counter(event_id), 1)
            .await
            .map_err(store_err)?;

        let now = Utc::now();
        let mut entry = QueueEntry {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            session_id: session_id.to_string(),
            position,
            status: QueueStatus::Waiting,
            entered_at: now,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };
        if (length as usize) < active_limit {
            entry.status = QueueStatus::Active;
            entry.expires_at = Some(now + active_ttl);
        }

        let data = serde_json::to_string(&entry).map_err(encode_err)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .rpush(keys::queue(event_id), user_id.to_string())
            .ignore()
            .set(&entry_key, data)
            .ignore()
            .hset(keys::session(session_id), "queue_entry", &entry_key)
            .ignore();
        if let Some(expires_at) = entry.expires_at {
            pipe.zadd(keys::QUEUE_ACTIVE_EXPIRY, &entry_key, expires_at.timestamp())
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;

        tracing::info!(
            event_id = %event_id,
            user_id = %user_id,
            position = entry.position,
            status = ?entry.status,
            "joined queue"
        );
        Ok(entry)
    }

    async fn entry_for_user(&self, event_id: EventId, user_id: UserId) -> Result<QueueEntry> {
        self.load_entry(&keys::queue_entry(event_id, user_id)).await
    }

    async fn entry_for_session(&self, session_id: &str) -> Result<QueueEntry> {
        let mut conn = self.store.conn();
        let entry_key: Option<String> = conn
            .hget(keys::session(session_id), "queue_entry")
            .await
            .map_err(store_err)?;
        let entry_key = entry_key.ok_or(Error::NotFound {
            entity: "queue entry",
        })?;
        self.load_entry(&entry_key).await
    }

    async fn queue_length(&self, event_id: EventId) -> Result<u64> {
        let mut conn = self.store.conn();
        let length: u64 = conn.llen(keys::queue(event_id)).await.map_err(store_err)?;
        Ok(length)
    }

    async fn activate_next(
        &self,
        event_id: EventId,
        popped_status: QueueStatus,
        active_ttl: Duration,
    ) -> Result<Option<QueueEntry>> {
        let mut conn = self.store.conn();

        let popped: Option<String> = conn
            .lpop(keys::queue(event_id), None)
            .await
            .map_err(store_err)?;
        let Some(popped) = popped else {
            return Ok(None);
        };

        // Retire the popped entry.
        if let Ok(user_id) = popped.parse::<UserId>() {
            match self.entry_for_user(event_id, user_id).await {
                Ok(mut entry) => {
                    entry.status = popped_status;
                    entry.expires_at = None;
                    entry.updated_at = Utc::now();
                    self.persist(&entry).await?;
                }
                Err(Error::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        // Promote the new head.
        let head: Option<String> = conn
            .lindex(keys::queue(event_id), 0)
            .await
            .map_err(store_err)?;
        let Some(head) = head else {
            return Ok(None);
        };
        let user_id = head.parse::<UserId>().map_err(|_| Error::Serialization(
            format!("queue head is not a user id: {head}"),
        ))?;

        let mut entry = self.entry_for_user(event_id, user_id).await?;
        entry.status = QueueStatus::Active;
        entry.expires_at = Some(Utc::now() + active_ttl);
        entry.updated_at = Utc::now();
        self.persist(&entry).await?;

        tracing::info!(
            event_id = %event_id,
            user_id = %entry.user_id,
            position = entry.position,
            "promoted queue head"
        );
        Ok(Some(entry))
    }

    async fn update(&self, entry: &QueueEntry) -> Result<()> {
        let mut entry = entry.clone();
        entry.updated_at = Utc::now();
        self.persist(&entry).await
    }

    async fn active_entries(&self, event_id: EventId) -> Result<Vec<QueueEntry>> {
        // Every Active entry is in the expiry index; filter it by event.
        let mut conn = self.store.conn();
        let entry_keys: Vec<String> = conn
            .zrange(keys::QUEUE_ACTIVE_EXPIRY, 0, -1)
            .await
            .map_err(store_err)?;

        let mut entries = Vec::new();
        for entry_key in entry_keys {
            match self.load_entry(&entry_key).await {
                Ok(entry)
                    if entry.event_id == event_id && entry.is_active() && !entry.is_expired() =>
                {
                    entries.push(entry);
                }
                Ok(_) | Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        entries.sort_by_key(|e| e.position);
        Ok(entries)
    }

    async fn expired_entries(&self, now: DateTime<Utc>) -> Result<Vec<QueueEntry>> {
        let mut conn = self.store.conn();
        let entry_keys: Vec<String> = conn
            .zrangebyscore(keys::QUEUE_ACTIVE_EXPIRY, "-inf", now.timestamp())
            .await
            .map_err(store_err)?;

        let mut entries = Vec::with_capacity(entry_keys.len());
        for entry_key in entry_keys {
            match self.load_entry(&entry_key).await {
                Ok(entry) if entry.is_active() && entry.is_expired() => entries.push(entry),
                Ok(_) | Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Redis instance:
    //   docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn fifo_join_and_promotion() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisQueueRepository::new(store);
        let event_id = EventId::new();
        let (u1, u2) = (UserId::new(), UserId::new());
        let ttl = Duration::minutes(15);

        let first = repo.join(event_id, u1, "s1", 1, ttl).await.unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(first.status, QueueStatus::Active);

        let second = repo.join(event_id, u2, "s2", 1, ttl).await.unwrap();
        assert_eq!(second.position, 2);
        assert_eq!(second.status, QueueStatus::Waiting);

        // Re-join is idempotent.
        let again = repo.join(event_id, u1, "s1", 1, ttl).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(repo.queue_length(event_id).await.unwrap(), 2);

        let promoted = repo
            .activate_next(event_id, QueueStatus::Completed, ttl)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.user_id, u2);
        assert_eq!(promoted.status, QueueStatus::Active);

        let retired = repo.entry_for_user(event_id, u1).await.unwrap();
        assert_eq!(retired.status, QueueStatus::Completed);

        // Session binding resolves to the same entry.
        let by_session = repo.entry_for_session("s2").await.unwrap();
        assert_eq!(by_session.id, promoted.id);
    }
}
