//! Store key layout.
//!
//! The layout is wire-compatible with the existing deployment; renaming a
//! key here is a data migration, not a refactor.
//!
//! ```text
//! event:{eventId}                       JSON Event
//! event:{eventId}:available_tickets     integer counter
//! events:all, events:active             set of eventId
//! seat:{seatId}                         JSON Seat
//! event_seats:{eventId}                 set of seatId
//! event_seats:{eventId}:available       set of seatId
//! event_seats:{eventId}:section:{sec}   set of seatId
//! ticket:{ticketId}                     JSON Ticket
//! user_tickets:{userId}                 set of ticketId
//! event_tickets:{eventId}               set of ticketId
//! seat_ticket:{seatId}                  ticketId
//! tickets:{status}                      set of ticketId
//! tickets:reserved:expiry               zset expiresAt → ticketId
//! queue:{eventId}                       list of userId
//! queue:{eventId}:position              insertion-rank counter
//! queue_entry:{eventId}:{userId}        JSON QueueEntry
//! queue:active:expiry                   zset expiresAt → entry key
//! session:{sessionId}                   hash {queue_entry: entry key}
//! lock:{resource}                       string, NX+TTL
//! ```

use turnstile_core::domain::{EventId, SeatId, TicketId, UserId};

/// Set of all event ids.
pub const EVENTS_ALL: &str = "events:all";

/// Set of Active event ids.
pub const EVENTS_ACTIVE: &str = "events:active";

/// Expiry index over Reserved tickets (score = unix seconds).
pub const TICKETS_RESERVED_EXPIRY: &str = "tickets:reserved:expiry";

/// Expiry index over Active queue entries (score = unix seconds).
pub const QUEUE_ACTIVE_EXPIRY: &str = "queue:active:expiry";

/// JSON event body.
#[must_use]
pub fn event(id: EventId) -> String {
    format!("event:{id}")
}

/// Available-ticket counter for an event.
#[must_use]
pub fn event_counter(id: EventId) -> String {
    format!("event:{id}:available_tickets")
}

/// JSON seat body.
#[must_use]
pub fn seat(id: SeatId) -> String {
    format!("seat:{id}")
}

/// Set of every seat id of an event.
#[must_use]
pub fn event_seats(event_id: EventId) -> String {
    format!("event_seats:{event_id}")
}

/// Set of currently Available seat ids of an event.
#[must_use]
pub fn event_seats_available(event_id: EventId) -> String {
    format!("event_seats:{event_id}:available")
}

/// Set of seat ids in one section of an event.
#[must_use]
pub fn event_seats_section(event_id: EventId, section: &str) -> String {
    format!("event_seats:{event_id}:section:{section}")
}

/// JSON ticket body.
#[must_use]
pub fn ticket(id: TicketId) -> String {
    format!("ticket:{id}")
}

/// Set of a user's ticket ids.
#[must_use]
pub fn user_tickets(user_id: UserId) -> String {
    format!("user_tickets:{user_id}")
}

/// Set of an event's ticket ids.
#[must_use]
pub fn event_tickets(event_id: EventId) -> String {
    format!("event_tickets:{event_id}")
}

/// Binding from a seat to the ticket holding it.
#[must_use]
pub fn seat_ticket(seat_id: SeatId) -> String {
    format!("seat_ticket:{seat_id}")
}

/// Status index over tickets (`reserved`, `confirmed`, `cancelled`).
#[must_use]
pub fn tickets_by_status(status: &str) -> String {
    format!("tickets:{status}")
}

/// FIFO list of user ids waiting for an event.
#[must_use]
pub fn queue(event_id: EventId) -> String {
    format!("queue:{event_id}")
}

/// Monotonic insertion-rank counter for an event's queue. Positions are
/// assigned from this counter, never from the live list length, so a
/// reported position survives head pops unchanged.
#[must_use]
pub fn queue_position_counter(event_id: EventId) -> String {
    format!("queue:{event_id}:position")
}

/// JSON queue entry for one user of one event.
#[must_use]
pub fn queue_entry(event_id: EventId, user_id: UserId) -> String {
    format!("queue_entry:{event_id}:{user_id}")
}

/// Session hash binding an opaque token to its queue entry key.
#[must_use]
pub fn session(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Per-resource mutex key.
#[must_use]
pub fn lock(resource: &str) -> String {
    format!("lock:{resource}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_stable() {
        let event_id: EventId = "6d9f3f6e-5c0e-4a3e-9d8a-111111111111".parse().unwrap();
        let user_id: UserId = "6d9f3f6e-5c0e-4a3e-9d8a-222222222222".parse().unwrap();
        let seat_id: SeatId = "6d9f3f6e-5c0e-4a3e-9d8a-333333333333".parse().unwrap();

        assert_eq!(
            event(event_id),
            "event:6d9f3f6e-5c0e-4a3e-9d8a-111111111111"
        );
        assert_eq!(
            event_counter(event_id),
            "event:6d9f3f6e-5c0e-4a3e-9d8a-111111111111:available_tickets"
        );
        assert_eq!(
            event_seats_available(event_id),
            "event_seats:6d9f3f6e-5c0e-4a3e-9d8a-111111111111:available"
        );
        assert_eq!(
            event_seats_section(event_id, "A"),
            "event_seats:6d9f3f6e-5c0e-4a3e-9d8a-111111111111:section:A"
        );
        assert_eq!(
            queue_entry(event_id, user_id),
            "queue_entry:6d9f3f6e-5c0e-4a3e-9d8a-111111111111:6d9f3f6e-5c0e-4a3e-9d8a-222222222222"
        );
        assert_eq!(
            seat_ticket(seat_id),
            "seat_ticket:6d9f3f6e-5c0e-4a3e-9d8a-333333333333"
        );
        assert_eq!(tickets_by_status("reserved"), "tickets:reserved");
        assert_eq!(session("abc"), "session:abc");
        assert_eq!(lock("queue_join:e1"), "lock:queue_join:e1");
    }
}
