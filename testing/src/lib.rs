//! # Turnstile Testing
//!
//! In-memory implementations of the `turnstile-core` store contracts.
//!
//! Each store serializes its mutations through one interior mutex, so a
//! multi-key operation (seat reservation, counter move, head promotion)
//! is atomic exactly the way the production Lua scripts are. Coordinator
//! tests therefore exercise the real concurrency semantics at memory
//! speed, with no Redis instance required.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

mod cache;
mod event;
mod lock;
mod queue;
mod seat;
mod ticket;

pub use cache::MemoryCache;
pub use event::MemoryEventRepository;
pub use lock::MemoryLock;
pub use queue::MemoryQueueRepository;
pub use seat::MemorySeatRepository;
pub use ticket::MemoryTicketRepository;

use turnstile_core::{Error, Result};

/// Lock a store mutex, surfacing poisoning as a store failure.
fn guard<T>(mutex: &std::sync::Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::StoreUnavailable("memory store mutex poisoned".into()))
}
