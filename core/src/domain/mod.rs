//! Domain entities for events, seats, tickets, and the admission queue.
//!
//! Entities are plain values: they live in the shared store as JSON, are
//! referenced by id, and carry their own state-machine predicates. All
//! timestamps are UTC.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

mod event;
mod queue;
mod seat;
mod ticket;

pub use event::{Event, EventStatus};
pub use queue::{QueueEntry, QueueStatus};
pub use seat::{Seat, SeatStatus};
pub use ticket::{Ticket, TicketStatus};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

entity_id! {
    /// Identity of an [`Event`].
    EventId
}

entity_id! {
    /// Identity of a [`Seat`].
    SeatId
}

entity_id! {
    /// Identity of a [`Ticket`].
    TicketId
}

entity_id! {
    /// Identity of a buyer.
    UserId
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_round_trip() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);

        let parsed: EventId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn ids_serialize_as_bare_uuid_strings() {
        let id = TicketId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
