//! # Turnstile Redis Store
//!
//! Redis implementations of the `turnstile-core` store contracts.
//!
//! Everything durable lives in Redis under the key layout in [`keys`];
//! multi-key state transitions (seat reservation, ticket confirmation,
//! counter moves) are Lua scripts so they are atomic with respect to every
//! other store operation, and per-resource mutual exclusion is provided by
//! [`RedisLock`] (`SET NX` with TTL).
//!
//! All repositories share one [`RedisStore`] connection manager; cloning
//! is cheap and connection pooling is handled by the manager.
//!
//! # Example
//!
//! ```no_run
//! use turnstile_redis::{RedisStore, RedisEventRepository, RedisLock};
//!
//! # async fn example() -> turnstile_core::Result<()> {
//! let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
//! let events = RedisEventRepository::new(store.clone());
//! let lock = RedisLock::new(store);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

mod cache;
mod client;
mod event;
pub mod keys;
mod lock;
mod queue;
mod seat;
mod ticket;

pub use cache::MemoryListingCache;
pub use client::RedisStore;
pub use event::RedisEventRepository;
pub use lock::RedisLock;
pub use queue::RedisQueueRepository;
pub use seat::RedisSeatRepository;
pub use ticket::RedisTicketRepository;
