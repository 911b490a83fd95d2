//! Error types for ticketing operations.

use thiserror::Error;

/// Result type alias for ticketing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-visible error taxonomy for the ticketing core.
///
/// Every operation in the coordinator, queue, and inventory surfaces one of
/// these variants. Transport layers map them onto status codes; the
/// classification helpers below tell callers which failures are worth
/// retrying and which are their own fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════
    /// Entity id unknown to the store.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up (e.g. "event", "ticket").
        entity: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // Event / admission
    // ═══════════════════════════════════════════════════════════
    /// Event is inactive, past its end time, or sold out.
    #[error("event is not available for purchase")]
    EventUnavailable,

    /// Session is missing, expired, not Active, or bound to a different
    /// user or event than the request claims.
    #[error("queue session is not active or has expired")]
    SessionInvalid,

    // ═══════════════════════════════════════════════════════════
    // Inventory
    // ═══════════════════════════════════════════════════════════
    /// A requested seat was not Available at reservation time.
    #[error("seat is not available")]
    SeatUnavailable,

    /// A seat release was attempted on a seat that is not Reserved.
    #[error("seat is not reserved")]
    SeatNotReserved,

    /// The standing-ticket counter would go negative.
    #[error("insufficient tickets available")]
    InsufficientInventory,

    // ═══════════════════════════════════════════════════════════
    // Ticket state machine
    // ═══════════════════════════════════════════════════════════
    /// Confirmation requires a Reserved ticket.
    #[error("ticket is not reserved")]
    TicketNotReserved,

    /// The reservation TTL elapsed before confirmation.
    #[error("ticket reservation has expired")]
    TicketExpired,

    /// The ticket was already cancelled.
    #[error("ticket is already cancelled")]
    AlreadyCancelled,

    // ═══════════════════════════════════════════════════════════
    // Contention / infrastructure
    // ═══════════════════════════════════════════════════════════
    /// A per-resource mutex could not be acquired within the retry budget.
    /// The caller may retry.
    #[error("resource is busy: {resource}")]
    LockBusy {
        /// Mutex resource name that was contended.
        resource: String,
    },

    /// Transient store failure. The caller may retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed input (empty name, end before start, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An entity failed to encode or decode.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` if the operation may succeed when retried as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// # use turnstile_core::Error;
    /// assert!(Error::StoreUnavailable("timeout".into()).is_retryable());
    /// assert!(!Error::SeatUnavailable.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockBusy { .. } | Self::StoreUnavailable(_))
    }

    /// Returns `true` if the failure is caused by the caller's input or
    /// timing rather than by the system.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EventUnavailable
                | Self::SessionInvalid
                | Self::SeatUnavailable
                | Self::InsufficientInventory
                | Self::TicketNotReserved
                | Self::TicketExpired
                | Self::AlreadyCancelled
                | Self::InvalidArgument(_)
        )
    }
}
