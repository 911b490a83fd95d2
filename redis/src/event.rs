//! Redis event repository.

use crate::client::{encode_err, store_err, RedisStore};
use crate::keys;
use chrono::Utc;
use redis::AsyncCommands;
use turnstile_core::domain::{Event, EventId, EventStatus};
use turnstile_core::repository::EventRepository;
use turnstile_core::{Error, Result};

/// Atomic read-compare-write decrement. `-1`: counter key absent,
/// `-2`: insufficient inventory; otherwise the new count.
const DECREMENT_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if current == false then
        return -1
    end

    local current_val = tonumber(current)
    local decrement_by = tonumber(ARGV[1])

    if current_val < decrement_by then
        return -2
    end

    local new_val = current_val - decrement_by
    redis.call('SET', KEYS[1], new_val)
    return new_val
"#;

/// Atomic increment. `-1`: counter key absent; otherwise the new count.
const INCREMENT_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if current == false then
        return -1
    end

    local new_val = tonumber(current) + tonumber(ARGV[1])
    redis.call('SET', KEYS[1], new_val)
    return new_val
"#;

/// Event storage: JSON body, `events:all` / `events:active` membership,
/// and the available-ticket counter.
#[derive(Debug, Clone)]
pub struct RedisEventRepository {
    store: RedisStore,
}

impl RedisEventRepository {
    /// Create a repository over a shared store handle.
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: EventId) -> Result<Event> {
        self.store
            .get_json(&keys::event(id))
            .await?
            .ok_or(Error::NotFound { entity: "event" })
    }

    /// Mirror a counter move into the JSON body so listings converge.
    /// The counter stays the source of truth for inventory decisions.
    async fn refresh_mirror(&self, id: EventId, available: i64) -> Result<()> {
        let mut event = self.load(id).await?;
        event.available_tickets = available;
        event.updated_at = Utc::now();
        self.store.set_json(&keys::event(id), &event).await
    }
}

impl EventRepository for RedisEventRepository {
    async fn create(&self, event: &Event) -> Result<()> {
        let data = serde_json::to_string(event).map_err(encode_err)?;
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(keys::event(event.id), data)
            .ignore()
            .set(keys::event_counter(event.id), event.available_tickets)
            .ignore()
            .sadd(keys::EVENTS_ALL, event.id.to_string())
            .ignore();
        if event.status == EventStatus::Active {
            pipe.sadd(keys::EVENTS_ACTIVE, event.id.to_string()).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;

        tracing::info!(event_id = %event.id, name = %event.name, "created event");
        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Event> {
        self.load(id).await
    }

    async fn update(&self, event: &Event) -> Result<()> {
        let data = serde_json::to_string(event).map_err(encode_err)?;
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic().set(keys::event(event.id), data).ignore();
        if event.status == EventStatus::Active {
            pipe.sadd(keys::EVENTS_ACTIVE, event.id.to_string()).ignore();
        } else {
            pipe.srem(keys::EVENTS_ACTIVE, event.id.to_string()).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(())
    }

    async fn delete(&self, id: EventId) -> Result<()> {
        let mut conn = self.store.conn();
        let _: () = redis::pipe()
            .atomic()
            .del(keys::event(id))
            .ignore()
            .del(keys::event_counter(id))
            .ignore()
            .srem(keys::EVENTS_ALL, id.to_string())
            .ignore()
            .srem(keys::EVENTS_ACTIVE, id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        tracing::info!(event_id = %id, "deleted event");
        Ok(())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Event>> {
        let mut conn = self.store.conn();
        let mut members: Vec<String> = conn.smembers(keys::EVENTS_ALL).await.map_err(store_err)?;
        // Set members come back in arbitrary order; sort so paging is stable.
        members.sort_unstable();

        let mut events = Vec::new();
        for member in members.into_iter().skip(offset).take(limit) {
            let Ok(id) = member.parse::<EventId>() else {
                continue;
            };
            match self.load(id).await {
                Ok(event) => events.push(event),
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }

    async fn active_events(&self) -> Result<Vec<Event>> {
        let mut conn = self.store.conn();
        let mut members: Vec<String> =
            conn.smembers(keys::EVENTS_ACTIVE).await.map_err(store_err)?;
        members.sort_unstable();

        let mut events = Vec::new();
        for member in members {
            let Ok(id) = member.parse::<EventId>() else {
                continue;
            };
            match self.load(id).await {
                Ok(event) => events.push(event),
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }

    async fn decrement_available(&self, id: EventId, n: i64) -> Result<i64> {
        let mut conn = self.store.conn();
        let outcome: i64 = redis::Script::new(DECREMENT_SCRIPT)
            .key(keys::event_counter(id))
            .arg(n)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        match outcome {
            -1 => Err(Error::NotFound { entity: "event" }),
            -2 => {
                tracing::warn!(event_id = %id, requested = n, "insufficient inventory");
                Err(Error::InsufficientInventory)
            }
            new_count => {
                self.refresh_mirror(id, new_count).await?;
                tracing::debug!(event_id = %id, available = new_count, "decremented counter");
                Ok(new_count)
            }
        }
    }

    async fn increment_available(&self, id: EventId, n: i64) -> Result<i64> {
        let mut conn = self.store.conn();
        let outcome: i64 = redis::Script::new(INCREMENT_SCRIPT)
            .key(keys::event_counter(id))
            .arg(n)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        match outcome {
            -1 => Err(Error::NotFound { entity: "event" }),
            new_count => {
                self.refresh_mirror(id, new_count).await?;
                tracing::debug!(event_id = %id, available = new_count, "incremented counter");
                Ok(new_count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event(total: i64) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            name: "Integration".into(),
            description: String::new(),
            venue: "Test Hall".into(),
            start_time: now + Duration::hours(1),
            end_time: now + Duration::hours(4),
            status: EventStatus::Active,
            total_tickets: total,
            available_tickets: total,
            is_seated: false,
            created_at: now,
            updated_at: now,
        }
    }

    // Requires a running Redis instance:
    //   docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn counter_decrement_and_floor() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisEventRepository::new(store);
        let event = sample_event(2);
        repo.create(&event).await.unwrap();

        assert_eq!(repo.decrement_available(event.id, 1).await.unwrap(), 1);
        assert_eq!(repo.decrement_available(event.id, 1).await.unwrap(), 0);
        assert_eq!(
            repo.decrement_available(event.id, 1).await,
            Err(Error::InsufficientInventory)
        );

        assert_eq!(repo.increment_available(event.id, 1).await.unwrap(), 1);
        repo.delete(event.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn missing_counter_is_not_found() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisEventRepository::new(store);
        assert_eq!(
            repo.decrement_available(EventId::new(), 1).await,
            Err(Error::NotFound { entity: "event" })
        );
    }
}
