//! Purchase, confirmation, and cancellation flows.

use crate::lock_guard::{acquire_with_retry, release_quietly};
use chrono::Utc;
use turnstile_core::adapter::Lock;
use turnstile_core::domain::{
    Event, EventId, SeatId, SeatStatus, Ticket, TicketId, TicketStatus, UserId,
};
use turnstile_core::repository::{
    EventRepository, QueueRepository, SeatRepository, TicketRepository,
};
use turnstile_core::{Error, Result, TicketingConfig};

/// Purchase coordination.
///
/// A purchase holds exactly one mutex (`purchase:{event}` for standing
/// inventory, `purchase:{event}:{seat}` for a seat) and performs the
/// inventory move inside it. Failures after the move are compensated
/// best-effort (seat released, counter restored) without overwriting the
/// original error; the expiry sweep is the ultimate safety net for
/// anything a crash leaves behind.
#[derive(Debug, Clone)]
pub struct TicketingService<T, E, S, Q, L> {
    tickets: T,
    events: E,
    seats: S,
    queues: Q,
    lock: L,
    config: TicketingConfig,
}

impl<T, E, S, Q, L> TicketingService<T, E, S, Q, L>
where
    T: TicketRepository,
    E: EventRepository,
    S: SeatRepository,
    Q: QueueRepository,
    L: Lock,
{
    /// Wire a ticketing service over its stores.
    pub fn new(tickets: T, events: E, seats: S, queues: Q, lock: L, config: TicketingConfig) -> Self {
        Self {
            tickets,
            events,
            seats,
            queues,
            lock,
            config,
        }
    }

    /// Reserve a ticket for an admitted buyer.
    ///
    /// The session must be Active, unexpired, and bound to exactly this
    /// `(event, user)` pair. The returned ticket is Reserved and holds
    /// inventory until confirmed, cancelled, or swept at its deadline.
    ///
    /// # Errors
    ///
    /// - `SessionInvalid` if the admission gate fails
    /// - `EventUnavailable` if the event cannot sell
    /// - `LockBusy` if the purchase mutex stays contended
    /// - `SeatUnavailable` / `InsufficientInventory` when the inventory
    ///   move loses the race
    pub async fn purchase(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_id: Option<SeatId>,
        session_id: &str,
    ) -> Result<Ticket> {
        tracing::info!(
            event_id = %event_id,
            user_id = %user_id,
            seat_id = ?seat_id,
            "starting purchase"
        );

        let entry = match self.queues.entry_for_session(session_id).await {
            Ok(entry) => entry,
            Err(Error::NotFound { .. }) => return Err(Error::SessionInvalid),
            Err(e) => return Err(e),
        };
        if !entry.is_active() || entry.is_expired() {
            tracing::warn!(session_id, status = ?entry.status, "purchase without active session");
            return Err(Error::SessionInvalid);
        }
        if entry.event_id != event_id || entry.user_id != user_id {
            tracing::warn!(
                session_event = %entry.event_id,
                session_user = %entry.user_id,
                "session bound to a different event or user"
            );
            return Err(Error::SessionInvalid);
        }

        let event = self.events.get(event_id).await?;
        if !event.can_purchase() {
            return Err(Error::EventUnavailable);
        }

        let resource = match seat_id {
            Some(seat) => format!("purchase:{event_id}:{seat}"),
            None => format!("purchase:{event_id}"),
        };
        acquire_with_retry(
            &self.lock,
            &resource,
            self.config.purchase_lock_ttl,
            &self.config.lock_retry,
        )
        .await?;

        let outcome = if event.is_seated {
            match seat_id {
                Some(seat) => self.purchase_seated(&event, user_id, seat).await,
                None => Err(Error::InvalidArgument(
                    "seat id is required for seated events".into(),
                )),
            }
        } else {
            self.purchase_standing(&event, user_id).await
        };

        release_quietly(&self.lock, &resource).await;

        if let Ok(ticket) = &outcome {
            tracing::info!(
                ticket_id = %ticket.id,
                event_id = %event_id,
                user_id = %user_id,
                price = ticket.price,
                "purchase reserved"
            );
        }
        outcome
    }

    /// Confirm a Reserved ticket before its deadline.
    ///
    /// The counter is untouched: the reservation already accounted for
    /// the unit. A seated ticket's seat moves Reserved → Sold.
    ///
    /// # Errors
    ///
    /// - `TicketNotReserved` if the ticket is not Reserved
    /// - `TicketExpired` if the deadline already passed
    pub async fn confirm(&self, ticket_id: TicketId) -> Result<Ticket> {
        let ticket = self.tickets.confirm(ticket_id, Utc::now()).await?;

        if let Some(seat_id) = ticket.seat_id {
            if let Err(e) = self.seats.mark_sold(seat_id).await {
                tracing::error!(
                    ticket_id = %ticket_id,
                    seat_id = %seat_id,
                    error = %e,
                    "failed to mark seat sold after confirmation"
                );
            }
        }
        Ok(ticket)
    }

    /// Cancel a ticket and return its inventory.
    ///
    /// Works on Reserved and Confirmed tickets alike: a Reserved seat is
    /// released, a Sold seat moves back to Available, and the counter
    /// gains one unit.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCancelled` on repeat calls; inventory is untouched
    /// then.
    pub async fn cancel(&self, ticket_id: TicketId) -> Result<Ticket> {
        let ticket = self.tickets.cancel(ticket_id).await?;

        if let Some(seat_id) = ticket.seat_id {
            self.release_cancelled_seat(ticket_id, seat_id).await;
        }
        if let Err(e) = self.events.increment_available(ticket.event_id, 1).await {
            tracing::error!(
                ticket_id = %ticket_id,
                event_id = %ticket.event_id,
                error = %e,
                "failed to return inventory after cancellation"
            );
        }

        tracing::info!(ticket_id = %ticket_id, "ticket cancelled");
        Ok(ticket)
    }

    /// Load one ticket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    pub async fn get_ticket(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.tickets.get(ticket_id).await
    }

    /// Every ticket a user holds.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn user_tickets(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        self.tickets.tickets_for_user(user_id).await
    }

    async fn purchase_seated(&self, event: &Event, user_id: UserId, seat_id: SeatId) -> Result<Ticket> {
        let seat = self.seats.get(seat_id).await?;
        if seat.event_id != event.id {
            return Err(Error::InvalidArgument(
                "seat does not belong to this event".into(),
            ));
        }
        if !seat.is_available() {
            tracing::warn!(seat_id = %seat_id, status = ?seat.status, "seat not available");
            return Err(Error::SeatUnavailable);
        }

        self.seats.reserve_seats(&[seat_id]).await?;

        let ticket = self.build_reservation(event.id, user_id, Some(seat_id), seat.price);
        if let Err(e) = self.tickets.create(&ticket).await {
            // The seat moved but no ticket points at it; put it back.
            if let Err(comp) = self.seats.release_seats(&[seat_id], false).await {
                tracing::error!(
                    seat_id = %seat_id,
                    error = %comp,
                    "failed to release seat after ticket creation failure"
                );
            }
            return Err(e);
        }

        if let Err(e) = self.events.decrement_available(event.id, 1).await {
            // Unwind the whole reservation so a failed purchase leaves no
            // half-held seat; the sweep covers whatever this misses.
            if let Err(comp) = self.tickets.cancel(ticket.id).await {
                tracing::error!(ticket_id = %ticket.id, error = %comp, "compensating cancel failed");
            }
            if let Err(comp) = self.seats.release_seats(&[seat_id], false).await {
                tracing::error!(seat_id = %seat_id, error = %comp, "compensating release failed");
            }
            return Err(e);
        }

        Ok(ticket)
    }

    async fn purchase_standing(&self, event: &Event, user_id: UserId) -> Result<Ticket> {
        if event.available_tickets <= 0 {
            return Err(Error::InsufficientInventory);
        }

        // The atomic decrement is the authoritative availability check.
        self.events.decrement_available(event.id, 1).await?;

        let ticket = self.build_reservation(
            event.id,
            user_id,
            None,
            self.config.standing_ticket_price,
        );
        if let Err(e) = self.tickets.create(&ticket).await {
            if let Err(comp) = self.events.increment_available(event.id, 1).await {
                tracing::error!(
                    event_id = %event.id,
                    error = %comp,
                    "failed to restore counter after ticket creation failure"
                );
            }
            return Err(e);
        }

        Ok(ticket)
    }

    fn build_reservation(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_id: Option<SeatId>,
        price: i64,
    ) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(),
            event_id,
            seat_id,
            user_id,
            price,
            status: TicketStatus::Reserved,
            issued_at: now,
            expires_at: Some(now + self.config.reservation_ttl),
            created_at: now,
            updated_at: now,
        }
    }

    async fn release_cancelled_seat(&self, ticket_id: TicketId, seat_id: SeatId) {
        let allow_sold = match self.seats.get(seat_id).await {
            Ok(seat) => match seat.status {
                SeatStatus::Reserved => false,
                SeatStatus::Sold => true,
                SeatStatus::Available => return,
            },
            Err(e) => {
                tracing::error!(
                    ticket_id = %ticket_id,
                    seat_id = %seat_id,
                    error = %e,
                    "failed to load seat during cancellation"
                );
                return;
            }
        };

        if let Err(e) = self.seats.release_seats(&[seat_id], allow_sold).await {
            tracing::error!(
                ticket_id = %ticket_id,
                seat_id = %seat_id,
                error = %e,
                "failed to release seat during cancellation"
            );
        }
    }
}
