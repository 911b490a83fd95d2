//! Seat entity.

use super::{EventId, SeatId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a seat.
///
/// Transitions: Available → Reserved → Sold, Reserved → Available on
/// release, and Sold → Available when a confirmed ticket is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// Free to reserve.
    Available,
    /// Held by a Reserved ticket pending confirmation.
    Reserved,
    /// Held by a Confirmed ticket.
    Sold,
}

/// A single seat in a venue layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    /// Seat id.
    pub id: SeatId,
    /// Owning event.
    pub event_id: EventId,
    /// Section label.
    pub section: String,
    /// Row label.
    pub row: String,
    /// Seat number within the row.
    pub number: String,
    /// Price in integer minor units.
    pub price: i64,
    /// Current state.
    pub status: SeatStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    /// Whether the seat can be reserved.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Whether the seat is held pending confirmation.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.status == SeatStatus::Reserved
    }

    /// Whether the seat belongs to a confirmed ticket.
    #[must_use]
    pub fn is_sold(&self) -> bool {
        self.status == SeatStatus::Sold
    }

    /// Human-readable identifier, e.g. `"A-12-4"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.row.is_empty() || self.number.is_empty() {
            self.section.clone()
        } else {
            format!("{}-{}-{}", self.section, self.row, self.number)
        }
    }
}
