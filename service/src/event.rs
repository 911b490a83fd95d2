//! Event administration and listings.

use chrono::{DateTime, Utc};
use turnstile_core::adapter::Cache;
use turnstile_core::domain::{Event, EventId, EventStatus, Seat, SeatId, SeatStatus};
use turnstile_core::repository::{EventRepository, SeatRepository};
use turnstile_core::{Error, Result};

const EVENTS_ALL_CACHE: &str = "events:all";
const EVENTS_ACTIVE_CACHE: &str = "events:active";

fn available_seats_cache(event_id: EventId) -> String {
    format!("seats:available:{event_id}")
}

/// Parameters for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Venue name.
    pub venue: String,
    /// Doors open.
    pub start_time: DateTime<Utc>,
    /// Sales close.
    pub end_time: DateTime<Utc>,
    /// Total inventory.
    pub total_tickets: i64,
    /// Whether buyers pick individual seats.
    pub is_seated: bool,
}

/// Parameters for one seat in a layout batch.
#[derive(Debug, Clone)]
pub struct NewSeat {
    /// Section label.
    pub section: String,
    /// Row label.
    pub row: String,
    /// Seat number within the row.
    pub number: String,
    /// Price in integer minor units.
    pub price: i64,
}

/// Event administration: creation, updates, seat layout, listings.
///
/// Listings go through the read-through cache with short freshness
/// bounds; everything the purchase path depends on reads the store
/// directly.
#[derive(Debug, Clone)]
pub struct EventService<E, S, C> {
    events: E,
    seats: S,
    cache: C,
}

impl<E, S, C> EventService<E, S, C>
where
    E: EventRepository,
    S: SeatRepository,
    C: Cache,
{
    /// Wire an event service over its stores.
    pub fn new(events: E, seats: S, cache: C) -> Self {
        Self {
            events,
            seats,
            cache,
        }
    }

    fn validate(new_event: &NewEvent) -> Result<()> {
        if new_event.name.trim().is_empty() {
            return Err(Error::InvalidArgument("event name is required".into()));
        }
        if new_event.end_time <= new_event.start_time {
            return Err(Error::InvalidArgument(
                "event end time must be after start time".into(),
            ));
        }
        if new_event.total_tickets < 0 {
            return Err(Error::InvalidArgument(
                "total tickets must not be negative".into(),
            ));
        }
        Ok(())
    }

    async fn invalidate_listings(&self) {
        for key in [EVENTS_ALL_CACHE, EVENTS_ACTIVE_CACHE] {
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(key, error = %e, "failed to invalidate listing cache");
            }
        }
    }

    /// Create an event with its full inventory available.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed input, otherwise store
    /// errors.
    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        Self::validate(&new_event)?;

        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: new_event.name,
            description: new_event.description,
            venue: new_event.venue,
            start_time: new_event.start_time,
            end_time: new_event.end_time,
            status: EventStatus::Active,
            total_tickets: new_event.total_tickets,
            available_tickets: new_event.total_tickets,
            is_seated: new_event.is_seated,
            created_at: now,
            updated_at: now,
        };
        self.events.create(&event).await?;
        self.invalidate_listings().await;

        tracing::info!(event_id = %event.id, name = %event.name, "event created");
        Ok(event)
    }

    /// Load one event.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    pub async fn get_event(&self, id: EventId) -> Result<Event> {
        self.events.get(id).await
    }

    /// Page through all events. Served from cache within its freshness
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn list_events(&self, offset: usize, limit: usize) -> Result<Vec<Event>> {
        // Only the unpaged head listing is cached; deep pages are rare.
        if offset == 0 {
            if let Ok(Some(cached)) = self.cache.get::<Vec<Event>>(EVENTS_ALL_CACHE).await {
                return Ok(cached.into_iter().take(limit).collect());
            }
        }

        let events = self.events.list(offset, limit).await?;
        if offset == 0 {
            if let Err(e) = self
                .cache
                .set(EVENTS_ALL_CACHE, &events, chrono::Duration::minutes(2))
                .await
            {
                tracing::warn!(error = %e, "failed to cache events listing");
            }
        }
        Ok(events)
    }

    /// All events currently on sale. Served from cache within its
    /// freshness bound.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn active_events(&self) -> Result<Vec<Event>> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<Event>>(EVENTS_ACTIVE_CACHE).await {
            return Ok(cached);
        }

        let events = self.events.active_events().await?;
        if let Err(e) = self
            .cache
            .set(EVENTS_ACTIVE_CACHE, &events, chrono::Duration::minutes(5))
            .await
        {
            tracing::warn!(error = %e, "failed to cache active events");
        }
        Ok(events)
    }

    /// Overwrite an event's administrative fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed input, `NotFound` for
    /// unknown ids, otherwise store errors.
    pub async fn update_event(&self, event: &Event) -> Result<()> {
        if event.name.trim().is_empty() {
            return Err(Error::InvalidArgument("event name is required".into()));
        }
        // Existence check keeps update from resurrecting deleted events.
        self.events.get(event.id).await?;

        let mut event = event.clone();
        event.updated_at = Utc::now();
        self.events.update(&event).await?;
        self.invalidate_listings().await;
        Ok(())
    }

    /// Delete an event and its seat layout.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn delete_event(&self, id: EventId) -> Result<()> {
        self.seats.delete_for_event(id).await?;
        self.events.delete(id).await?;
        self.invalidate_listings().await;
        if let Err(e) = self.cache.delete(&available_seats_cache(id)).await {
            tracing::warn!(event_id = %id, error = %e, "failed to invalidate seat cache");
        }
        Ok(())
    }

    /// Create a batch of seats for a seated event.
    ///
    /// # Returns
    ///
    /// The number of seats created.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown events, `InvalidArgument` when the
    /// event is not seated or a seat has a negative price, otherwise
    /// store errors.
    pub async fn create_seats(&self, event_id: EventId, new_seats: Vec<NewSeat>) -> Result<usize> {
        let event = self.events.get(event_id).await?;
        if !event.is_seated {
            return Err(Error::InvalidArgument(
                "seats can only be defined for seated events".into(),
            ));
        }
        if new_seats.iter().any(|s| s.price < 0) {
            return Err(Error::InvalidArgument(
                "seat price must not be negative".into(),
            ));
        }

        let now = Utc::now();
        let seats: Vec<Seat> = new_seats
            .into_iter()
            .map(|s| Seat {
                id: SeatId::new(),
                event_id,
                section: s.section,
                row: s.row,
                number: s.number,
                price: s.price,
                status: SeatStatus::Available,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let count = self.seats.create_batch(&seats).await?;
        if let Err(e) = self.cache.delete(&available_seats_cache(event_id)).await {
            tracing::warn!(event_id = %event_id, error = %e, "failed to invalidate seat cache");
        }

        tracing::info!(event_id = %event_id, count, "seat layout created");
        Ok(count)
    }

    /// Snapshot of the available seats, served from cache within a short
    /// freshness bound. Listings only; reservations re-check the store.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn available_seats(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let cache_key = available_seats_cache(event_id);
        if let Ok(Some(cached)) = self.cache.get::<Vec<Seat>>(&cache_key).await {
            return Ok(cached);
        }

        let seats = self.seats.available_seats(event_id).await?;
        if let Err(e) = self
            .cache
            .set(&cache_key, &seats, chrono::Duration::minutes(1))
            .await
        {
            tracing::warn!(event_id = %event_id, error = %e, "failed to cache available seats");
        }
        Ok(seats)
    }

    /// Seats of one section.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn seats_in_section(&self, event_id: EventId, section: &str) -> Result<Vec<Seat>> {
        self.seats.seats_in_section(event_id, section).await
    }
}
