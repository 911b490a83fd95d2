//! In-memory admission-queue repository.

use crate::guard;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use turnstile_core::domain::{EventId, QueueEntry, QueueStatus, UserId};
use turnstile_core::repository::QueueRepository;
use turnstile_core::{Error, Result};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    lists: HashMap<EventId, VecDeque<UserId>>,
    entries: HashMap<(EventId, UserId), QueueEntry>,
    sessions: HashMap<String, (EventId, UserId)>,
    /// Insertion-rank counters; positions survive head pops unchanged.
    next_position: HashMap<EventId, u64>,
}

/// In-memory queue store. Join and promotion mutate the list and the
/// entry bodies under one mutex, the way the production repository does
/// under the coordinator's per-event mutexes.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryQueueRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an entry directly, bypassing join/promotion.
    ///
    /// Test-only backdoor for staging states the public API cannot
    /// produce on demand (e.g. an Active window that already elapsed).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store mutex is poisoned.
    pub fn put(&self, entry: &QueueEntry) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        inner
            .sessions
            .insert(entry.session_id.clone(), (entry.event_id, entry.user_id));
        inner
            .entries
            .insert((entry.event_id, entry.user_id), entry.clone());
        Ok(())
    }
}

impl QueueRepository for MemoryQueueRepository {
    async fn join(
        &self,
        event_id: EventId,
        user_id: UserId,
        session_id: &str,
        active_limit: usize,
        active_ttl: Duration,
    ) -> Result<QueueEntry> {
        let mut inner = guard(&self.inner)?;

        if let Some(existing) = inner.entries.get(&(event_id, user_id)) {
            if !existing.is_terminal() {
                return Ok(existing.clone());
            }
        }

        let length = inner.lists.get(&event_id).map_or(0, VecDeque::len);
        let position = {
            let counter = inner.next_position.entry(event_id).or_insert(0);
            *counter += 1;
            *counter
        };
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
        if length < active_limit {
            entry.status = QueueStatus::Active;
            entry.expires_at = Some(now + active_ttl);
        }

        inner.lists.entry(event_id).or_default().push_back(user_id);
        inner
            .sessions
            .insert(session_id.to_string(), (event_id, user_id));
        inner.entries.insert((event_id, user_id), entry.clone());
        Ok(entry)
    }

    async fn entry_for_user(&self, event_id: EventId, user_id: UserId) -> Result<QueueEntry> {
        guard(&self.inner)?
            .entries
            .get(&(event_id, user_id))
            .cloned()
            .ok_or(Error::NotFound {
                entity: "queue entry",
            })
    }

    async fn entry_for_session(&self, session_id: &str) -> Result<QueueEntry> {
        let inner = guard(&self.inner)?;
        inner
            .sessions
            .get(session_id)
            .and_then(|key| inner.entries.get(key))
            .cloned()
            .ok_or(Error::NotFound {
                entity: "queue entry",
            })
    }

    async fn queue_length(&self, event_id: EventId) -> Result<u64> {
        Ok(guard(&self.inner)?
            .lists
            .get(&event_id)
            .map_or(0, VecDeque::len) as u64)
    }

    async fn activate_next(
        &self,
        event_id: EventId,
        popped_status: QueueStatus,
        active_ttl: Duration,
    ) -> Result<Option<QueueEntry>> {
        let mut inner = guard(&self.inner)?;

        let Some(popped) = inner
            .lists
            .get_mut(&event_id)
            .and_then(VecDeque::pop_front)
        else {
            return Ok(None);
        };
        if let Some(entry) = inner.entries.get_mut(&(event_id, popped)) {
            entry.status = popped_status;
            entry.expires_at = None;
            entry.updated_at = Utc::now();
        }

        let Some(head) = inner
            .lists
            .get(&event_id)
            .and_then(|list| list.front().copied())
        else {
            return Ok(None);
        };
        let entry = inner
            .entries
            .get_mut(&(event_id, head))
            .ok_or(Error::NotFound {
                entity: "queue entry",
            })?;
        entry.status = QueueStatus::Active;
        entry.expires_at = Some(Utc::now() + active_ttl);
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn update(&self, entry: &QueueEntry) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        let mut entry = entry.clone();
        entry.updated_at = Utc::now();
        inner
            .entries
            .insert((entry.event_id, entry.user_id), entry);
        Ok(())
    }

    async fn active_entries(&self, event_id: EventId) -> Result<Vec<QueueEntry>> {
        let inner = guard(&self.inner)?;
        let mut entries: Vec<QueueEntry> = inner
            .entries
            .values()
            .filter(|e| e.event_id == event_id && e.is_active() && !e.is_expired())
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.position);
        Ok(entries)
    }

    async fn expired_entries(&self, now: DateTime<Utc>) -> Result<Vec<QueueEntry>> {
        let inner = guard(&self.inner)?;
        let mut entries: Vec<QueueEntry> = inner
            .entries
            .values()
            .filter(|e| {
                e.is_active() && e.expires_at.is_some_and(|deadline| deadline < now)
            })
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.expires_at);
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_joiner_is_active_rest_wait() {
        let repo = MemoryQueueRepository::new();
        let event_id = EventId::new();
        let ttl = Duration::minutes(15);

        let first = repo
            .join(event_id, UserId::new(), "s1", 1, ttl)
            .await
            .unwrap();
        assert_eq!(first.status, QueueStatus::Active);
        assert!(first.expires_at.is_some());

        let second = repo
            .join(event_id, UserId::new(), "s2", 1, ttl)
            .await
            .unwrap();
        assert_eq!(second.status, QueueStatus::Waiting);
        assert_eq!(second.position, 2);
    }

    #[tokio::test]
    async fn promotion_retires_head_and_activates_next() {
        let repo = MemoryQueueRepository::new();
        let event_id = EventId::new();
        let ttl = Duration::minutes(15);
        let (u1, u2) = (UserId::new(), UserId::new());

        repo.join(event_id, u1, "s1", 1, ttl).await.unwrap();
        repo.join(event_id, u2, "s2", 1, ttl).await.unwrap();

        let promoted = repo
            .activate_next(event_id, QueueStatus::Completed, ttl)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.user_id, u2);

        let retired = repo.entry_for_user(event_id, u1).await.unwrap();
        assert_eq!(retired.status, QueueStatus::Completed);
        assert_eq!(retired.expires_at, None);
    }

    #[tokio::test]
    async fn empty_queue_promotes_nothing() {
        let repo = MemoryQueueRepository::new();
        let outcome = repo
            .activate_next(EventId::new(), QueueStatus::Completed, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(outcome, None);
    }
}
