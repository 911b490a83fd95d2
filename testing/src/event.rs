//! In-memory event repository.

use crate::guard;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use turnstile_core::domain::{Event, EventId, EventStatus};
use turnstile_core::repository::EventRepository;
use turnstile_core::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    counters: HashMap<EventId, i64>,
}

/// In-memory event store. The counter map plays the role of the
/// store-side counter key; counter moves and the event mirror update
/// happen under one mutex, matching the production script's atomicity.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryEventRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventRepository for MemoryEventRepository {
    async fn create(&self, event: &Event) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        inner.counters.insert(event.id, event.available_tickets);
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Event> {
        let inner = guard(&self.inner)?;
        inner
            .events
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound { entity: "event" })
    }

    async fn update(&self, event: &Event) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete(&self, id: EventId) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        inner.events.remove(&id);
        inner.counters.remove(&id);
        Ok(())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Event>> {
        let inner = guard(&self.inner)?;
        let mut events: Vec<Event> = inner.events.values().cloned().collect();
        events.sort_by_key(|e| e.id);
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn active_events(&self) -> Result<Vec<Event>> {
        let inner = guard(&self.inner)?;
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| e.status == EventStatus::Active)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    async fn decrement_available(&self, id: EventId, n: i64) -> Result<i64> {
        let mut inner = guard(&self.inner)?;
        let current = *inner
            .counters
            .get(&id)
            .ok_or(Error::NotFound { entity: "event" })?;
        if current < n {
            return Err(Error::InsufficientInventory);
        }

        let new_count = current - n;
        inner.counters.insert(id, new_count);
        if let Some(event) = inner.events.get_mut(&id) {
            event.available_tickets = new_count;
            event.updated_at = Utc::now();
        }
        Ok(new_count)
    }

    async fn increment_available(&self, id: EventId, n: i64) -> Result<i64> {
        let mut inner = guard(&self.inner)?;
        let current = *inner
            .counters
            .get(&id)
            .ok_or(Error::NotFound { entity: "event" })?;

        let new_count = current + n;
        inner.counters.insert(id, new_count);
        if let Some(event) = inner.events.get_mut(&id) {
            event.available_tickets = new_count;
            event.updated_at = Utc::now();
        }
        Ok(new_count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event(total: i64) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            name: "Show".into(),
            description: String::new(),
            venue: "Hall".into(),
            start_time: now,
            end_time: now + Duration::hours(2),
            status: EventStatus::Active,
            total_tickets: total,
            available_tickets: total,
            is_seated: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn counter_floors_at_zero() {
        let repo = MemoryEventRepository::new();
        let event = sample_event(1);
        repo.create(&event).await.unwrap();

        assert_eq!(repo.decrement_available(event.id, 1).await.unwrap(), 0);
        assert_eq!(
            repo.decrement_available(event.id, 1).await,
            Err(Error::InsufficientInventory)
        );
        // The mirror followed the counter.
        assert_eq!(repo.get(event.id).await.unwrap().available_tickets, 0);
    }
}
