//! Event repository trait.

use crate::domain::{Event, EventId};
use crate::error::Result;

/// Event storage: the JSON entity, the `events:all` / `events:active`
/// indices, and the available-ticket counter.
///
/// The counter operations are the inventory hot path and must be single
/// atomic read-compare-write scripts; the JSON copy of the event follows
/// the counter, never the other way around.
pub trait EventRepository: Send + Sync {
    /// Persist a new event and index it.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn create(&self, event: &Event) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Load an event.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown.
    fn get(&self, id: EventId) -> impl std::future::Future<Output = Result<Event>> + Send;

    /// Overwrite an event and refresh its index membership.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn update(&self, event: &Event) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove an event and its index entries.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn delete(&self, id: EventId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Page through all events. Ordering is unspecified but stable within
    /// one listing.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Event>>> + Send;

    /// All events currently in `Active` status.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn active_events(&self) -> impl std::future::Future<Output = Result<Vec<Event>>> + Send;

    /// Atomically subtract `n` from the available-ticket counter.
    ///
    /// # Returns
    ///
    /// The new counter value.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the counter key is absent
    /// - `InsufficientInventory` if the counter is below `n`
    fn decrement_available(
        &self,
        id: EventId,
        n: i64,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Atomically add `n` to the available-ticket counter.
    ///
    /// Never fails for arithmetic reasons.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the counter key is absent.
    fn increment_available(
        &self,
        id: EventId,
        n: i64,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;
}
