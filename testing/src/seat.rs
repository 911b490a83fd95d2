//! In-memory seat repository.

use crate::guard;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use turnstile_core::domain::{EventId, Seat, SeatId, SeatStatus};
use turnstile_core::repository::SeatRepository;
use turnstile_core::{Error, Result};

/// In-memory seat store. Reserve and release validate every seat before
/// mutating any, under one mutex, so they are all-or-nothing like the
/// production scripts.
#[derive(Debug, Clone, Default)]
pub struct MemorySeatRepository {
    seats: Arc<Mutex<HashMap<SeatId, Seat>>>,
}

impl MemorySeatRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeatRepository for MemorySeatRepository {
    async fn create(&self, seat: &Seat) -> Result<()> {
        guard(&self.seats)?.insert(seat.id, seat.clone());
        Ok(())
    }

    async fn create_batch(&self, seats: &[Seat]) -> Result<usize> {
        let mut store = guard(&self.seats)?;
        for seat in seats {
            store.insert(seat.id, seat.clone());
        }
        Ok(seats.len())
    }

    async fn get(&self, id: SeatId) -> Result<Seat> {
        guard(&self.seats)?
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound { entity: "seat" })
    }

    async fn seats_for_event(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let store = guard(&self.seats)?;
        let mut seats: Vec<Seat> = store
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| s.id);
        Ok(seats)
    }

    async fn available_seats(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let store = guard(&self.seats)?;
        let mut seats: Vec<Seat> = store
            .values()
            .filter(|s| s.event_id == event_id && s.status == SeatStatus::Available)
            .cloned()
            .collect();
        seats.sort_by_key(|s| s.id);
        Ok(seats)
    }

    async fn seats_in_section(&self, event_id: EventId, section: &str) -> Result<Vec<Seat>> {
        let store = guard(&self.seats)?;
        let mut seats: Vec<Seat> = store
            .values()
            .filter(|s| s.event_id == event_id && s.section == section)
            .cloned()
            .collect();
        seats.sort_by_key(|s| s.id);
        Ok(seats)
    }

    async fn reserve_seats(&self, seat_ids: &[SeatId]) -> Result<()> {
        let mut store = guard(&self.seats)?;

        // Validate in order first; the first offender decides the error.
        for id in seat_ids {
            let seat = store.get(id).ok_or(Error::NotFound { entity: "seat" })?;
            if seat.status != SeatStatus::Available {
                return Err(Error::SeatUnavailable);
            }
        }
        for id in seat_ids {
            if let Some(seat) = store.get_mut(id) {
                seat.status = SeatStatus::Reserved;
                seat.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn release_seats(&self, seat_ids: &[SeatId], allow_sold: bool) -> Result<()> {
        let mut store = guard(&self.seats)?;

        for id in seat_ids {
            let seat = store.get(id).ok_or(Error::NotFound { entity: "seat" })?;
            let releasable = seat.status == SeatStatus::Reserved
                || (allow_sold && seat.status == SeatStatus::Sold);
            if !releasable {
                return Err(Error::SeatNotReserved);
            }
        }
        for id in seat_ids {
            if let Some(seat) = store.get_mut(id) {
                seat.status = SeatStatus::Available;
                seat.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn mark_sold(&self, seat_id: SeatId) -> Result<()> {
        let mut store = guard(&self.seats)?;
        let seat = store
            .get_mut(&seat_id)
            .ok_or(Error::NotFound { entity: "seat" })?;
        if seat.status != SeatStatus::Reserved {
            return Err(Error::SeatNotReserved);
        }
        seat.status = SeatStatus::Sold;
        seat.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_for_event(&self, event_id: EventId) -> Result<()> {
        guard(&self.seats)?.retain(|_, seat| seat.event_id != event_id);
        Ok(())
    }
}
