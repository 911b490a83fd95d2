//! Event entity.

use super::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// On sale.
    Active,
    /// Not on sale (draft or suspended by an operator).
    Inactive,
    /// All inventory is reserved or sold.
    SoldOut,
}

/// A ticketed event with bounded inventory.
///
/// `available_tickets` is mirrored from the store-side counter; the counter
/// is the source of truth during contested sales, this copy is what
/// listings render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Venue name.
    pub venue: String,
    /// Doors open.
    pub start_time: DateTime<Utc>,
    /// Sales close at this instant.
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Total inventory defined at creation.
    pub total_tickets: i64,
    /// Inventory not currently held by a Reserved or Confirmed ticket.
    pub available_tickets: i64,
    /// Whether buyers pick individual seats.
    pub is_seated: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event is on sale.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Whether the inventory is exhausted.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.status == EventStatus::SoldOut || self.available_tickets <= 0
    }

    /// Whether tickets can be purchased right now: active, inventory
    /// remaining, and sales not yet closed.
    #[must_use]
    pub fn can_purchase(&self) -> bool {
        self.is_active() && !self.is_sold_out() && Utc::now() < self.end_time
    }
}
