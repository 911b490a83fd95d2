//! In-memory ticket repository.

use crate::guard;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use turnstile_core::domain::{EventId, SeatId, Ticket, TicketId, TicketStatus, UserId};
use turnstile_core::repository::TicketRepository;
use turnstile_core::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    tickets: HashMap<TicketId, Ticket>,
    seat_bindings: HashMap<SeatId, TicketId>,
}

/// In-memory ticket store with the same atomic state transitions as the
/// production confirm/cancel scripts.
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTicketRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a ticket directly, bypassing the state machine.
    ///
    /// Test-only backdoor for staging states the public API cannot
    /// produce on demand (e.g. a reservation whose deadline already
    /// passed).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store mutex is poisoned.
    pub fn put(&self, ticket: &Ticket) -> Result<()> {
        let mut inner = guard(&self.inner)?;
        if let Some(seat_id) = ticket.seat_id {
            inner.seat_bindings.insert(seat_id, ticket.id);
        }
        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }
}

impl TicketRepository for MemoryTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<()> {
        self.put(ticket)
    }

    async fn get(&self, id: TicketId) -> Result<Ticket> {
        guard(&self.inner)?
            .tickets
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound { entity: "ticket" })
    }

    async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        let inner = guard(&self.inner)?;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.issued_at);
        Ok(tickets)
    }

    async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>> {
        let inner = guard(&self.inner)?;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.issued_at);
        Ok(tickets)
    }

    async fn ticket_for_seat(&self, seat_id: SeatId) -> Result<Ticket> {
        let inner = guard(&self.inner)?;
        inner
            .seat_bindings
            .get(&seat_id)
            .and_then(|id| inner.tickets.get(id))
            .cloned()
            .ok_or(Error::NotFound { entity: "ticket" })
    }

    async fn confirm(&self, id: TicketId, now: DateTime<Utc>) -> Result<Ticket> {
        let mut inner = guard(&self.inner)?;
        let ticket = inner
            .tickets
            .get_mut(&id)
            .ok_or(Error::NotFound { entity: "ticket" })?;

        if ticket.status != TicketStatus::Reserved {
            return Err(Error::TicketNotReserved);
        }
        if ticket.expires_at.is_some_and(|deadline| deadline < now) {
            return Err(Error::TicketExpired);
        }

        ticket.status = TicketStatus::Confirmed;
        ticket.expires_at = None;
        ticket.updated_at = now;
        Ok(ticket.clone())
    }

    async fn cancel(&self, id: TicketId) -> Result<Ticket> {
        let mut inner = guard(&self.inner)?;
        let ticket = inner
            .tickets
            .get_mut(&id)
            .ok_or(Error::NotFound { entity: "ticket" })?;

        if ticket.status == TicketStatus::Cancelled {
            return Err(Error::AlreadyCancelled);
        }

        ticket.status = TicketStatus::Cancelled;
        ticket.expires_at = None;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let inner = guard(&self.inner)?;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| {
                t.status == TicketStatus::Reserved
                    && t.expires_at.is_some_and(|deadline| deadline < now)
            })
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.expires_at);
        Ok(tickets)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reserved_ticket(expires_in: Duration) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(),
            event_id: EventId::new(),
            seat_id: None,
            user_id: UserId::new(),
            price: 5000,
            status: TicketStatus::Reserved,
            issued_at: now,
            expires_at: Some(now + expires_in),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn confirm_rejects_expired_reservations() {
        let repo = MemoryTicketRepository::new();
        let ticket = reserved_ticket(Duration::minutes(-1));
        repo.create(&ticket).await.unwrap();

        assert_eq!(
            repo.confirm(ticket.id, Utc::now()).await,
            Err(Error::TicketExpired)
        );
        let expired = repo.expired_reservations(Utc::now()).await.unwrap();
        assert_eq!(expired.len(), 1);
    }

    #[tokio::test]
    async fn cancel_is_not_repeatable() {
        let repo = MemoryTicketRepository::new();
        let ticket = reserved_ticket(Duration::minutes(15));
        repo.create(&ticket).await.unwrap();

        repo.cancel(ticket.id).await.unwrap();
        assert_eq!(repo.cancel(ticket.id).await, Err(Error::AlreadyCancelled));
    }
}
