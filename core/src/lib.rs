//! # Turnstile Core
//!
//! Domain model and store contracts for a high-demand event ticketing
//! backend: bounded inventory with a seat state machine, a fair
//! first-come-first-served admission queue, and the typed errors and
//! configuration shared by every component.
//!
//! This crate is deliberately free of I/O. Storage backends implement the
//! [`repository`] traits (see `turnstile-redis` for the production
//! implementation and `turnstile-testing` for the in-memory one); the
//! coordinator services in `turnstile-service` are written purely against
//! the traits.
//!
//! ## Architecture
//!
//! ```text
//! Coordinator (turnstile-service)
//!     │
//!     ├── repository::{Event,Seat,Ticket,Queue}Repository
//!     └── adapter::{Lock, Cache}
//!             │
//!             └── shared store (Redis)
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod repository;

pub use config::{LockRetryPolicy, TicketingConfig};
pub use error::{Error, Result};
