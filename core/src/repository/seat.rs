//! Seat repository trait.

use crate::domain::{EventId, Seat, SeatId};
use crate::error::Result;

/// Seat storage and the seat state machine.
///
/// `reserve_seats` and `release_seats` are all-or-nothing over the given
/// id list: if any seat is missing or in the wrong state, no seat is
/// mutated. Seats are evaluated in the given order and the first offending
/// seat determines the error.
pub trait SeatRepository: Send + Sync {
    /// Persist a new seat and index it (event, section, availability).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn create(&self, seat: &Seat) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Persist a batch of seats.
    ///
    /// # Returns
    ///
    /// The number of seats created.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure; previously created
    /// seats of the batch are not rolled back.
    fn create_batch(
        &self,
        seats: &[Seat],
    ) -> impl std::future::Future<Output = Result<usize>> + Send;

    /// Load a seat.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown.
    fn get(&self, id: SeatId) -> impl std::future::Future<Output = Result<Seat>> + Send;

    /// Every seat of an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn seats_for_event(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<Seat>>> + Send;

    /// Snapshot of the availability index.
    ///
    /// Suitable for listings; never a source of truth for reservation
    /// decisions.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn available_seats(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<Seat>>> + Send;

    /// Seats of one section.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn seats_in_section(
        &self,
        event_id: EventId,
        section: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Seat>>> + Send;

    /// Atomically transition every listed seat Available → Reserved and
    /// drop it from the availability index.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a seat id is unknown (no seat mutated)
    /// - `SeatUnavailable` if a seat is not Available (no seat mutated)
    fn reserve_seats(
        &self,
        seat_ids: &[SeatId],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically transition every listed seat back to Available and
    /// re-add it to the availability index.
    ///
    /// Requires each seat to be Reserved; with `allow_sold` the transition
    /// also accepts Sold seats (cancellation after confirmation).
    ///
    /// # Errors
    ///
    /// - `NotFound` if a seat id is unknown (no seat mutated)
    /// - `SeatNotReserved` if a seat is in a state the call does not
    ///   accept (no seat mutated)
    fn release_seats(
        &self,
        seat_ids: &[SeatId],
        allow_sold: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically transition one seat Reserved → Sold.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the seat id is unknown
    /// - `SeatNotReserved` if the seat is not Reserved
    fn mark_sold(&self, seat_id: SeatId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove every seat of an event, including index entries.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn delete_for_event(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
