//! Ticket repository trait.

use crate::domain::{EventId, SeatId, Ticket, TicketId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Ticket storage, secondary indices, and the ticket state machine.
///
/// The `confirm` and `cancel` transitions are atomic scripts: they check
/// the state machine, rewrite the entity, and maintain the status and
/// expiry indices in one step, so two concurrent confirmations of the same
/// ticket cannot both succeed.
pub trait TicketRepository: Send + Sync {
    /// Persist a new ticket and all its indices (user, event, seat
    /// binding, status, reservation expiry).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn create(&self, ticket: &Ticket) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Load a ticket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown.
    fn get(&self, id: TicketId) -> impl std::future::Future<Output = Result<Ticket>> + Send;

    /// Every ticket a user holds, across events.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn tickets_for_user(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Ticket>>> + Send;

    /// Every ticket of an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn tickets_for_event(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<Ticket>>> + Send;

    /// The ticket currently bound to a seat.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no ticket is bound to the seat.
    fn ticket_for_seat(
        &self,
        seat_id: SeatId,
    ) -> impl std::future::Future<Output = Result<Ticket>> + Send;

    /// Atomically transition Reserved → Confirmed and clear the
    /// reservation deadline.
    ///
    /// # Returns
    ///
    /// The ticket after the transition.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the id is unknown
    /// - `TicketNotReserved` if the ticket is not Reserved
    /// - `TicketExpired` if the reservation deadline is before `now`
    fn confirm(
        &self,
        id: TicketId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Ticket>> + Send;

    /// Atomically transition a non-Cancelled ticket to Cancelled.
    ///
    /// # Returns
    ///
    /// The ticket after the transition.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the id is unknown
    /// - `AlreadyCancelled` if the ticket is already Cancelled
    fn cancel(&self, id: TicketId) -> impl std::future::Future<Output = Result<Ticket>> + Send;

    /// Reserved tickets whose deadline is at or before `now`, oldest
    /// first. Input to the expiry sweep.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Ticket>>> + Send;
}
