//! Store contracts.
//!
//! These traits define everything the coordinator needs from the shared
//! store. They are interfaces, not implementations: production wires in
//! the Redis repositories, tests wire in the in-memory ones, and the
//! coordinator logic is identical over both.
//!
//! Implementations must make each mutating operation atomic with respect
//! to concurrent callers on the same keys (single atomic script or
//! equivalent); the coordinator adds per-resource mutexes on top but never
//! relies on them for single-operation atomicity.

mod event;
mod queue;
mod seat;
mod ticket;

pub use event::EventRepository;
pub use queue::QueueRepository;
pub use seat::SeatRepository;
pub use ticket::TicketRepository;
