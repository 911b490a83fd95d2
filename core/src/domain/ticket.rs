//! Ticket entity.

use super::{EventId, SeatId, TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a ticket.
///
/// Reserved is the only non-terminal state: it either becomes Confirmed
/// before `expires_at`, or Cancelled (explicitly, or by the expiry sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Holding inventory pending confirmation.
    Reserved,
    /// Paid for; terminal.
    Confirmed,
    /// Released back to inventory; terminal.
    Cancelled,
}

impl TicketStatus {
    /// Store-index name for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A ticket held or owned by a buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket id.
    pub id: TicketId,
    /// Owning event.
    pub event_id: EventId,
    /// Seat, if the event is seated. `None` for standing tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_id: Option<SeatId>,
    /// Buyer.
    pub user_id: UserId,
    /// Price in integer minor units.
    pub price: i64,
    /// Current state.
    pub status: TicketStatus,
    /// When the reservation was made.
    pub issued_at: DateTime<Utc>,
    /// Reservation deadline. Present iff the ticket is Reserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the ticket is Reserved.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.status == TicketStatus::Reserved
    }

    /// Whether the ticket is Confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == TicketStatus::Confirmed
    }

    /// Whether the ticket is Cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == TicketStatus::Cancelled
    }

    /// Whether the reservation deadline has passed.
    ///
    /// A ticket without a deadline (Confirmed or Cancelled) never expires.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Utc::now() > deadline,
            None => false,
        }
    }
}
