//! Admission-queue repository trait.

use crate::domain::{EventId, QueueEntry, QueueStatus, UserId};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};

/// Per-event FIFO of waiting buyers plus the session binding.
///
/// Join and promotion are invoked only under the coordinator's per-event
/// `queue_join` / `queue_process` mutexes; the repository relies on that
/// for position assignment but still keeps every individual write
/// consistent on its own.
pub trait QueueRepository: Send + Sync {
    /// Add a user to an event's queue.
    ///
    /// Idempotent per user: if the user already has a non-terminal entry
    /// for the event, that entry is returned unchanged. Otherwise the
    /// entry is appended with `position = length + 1`; it starts Active
    /// (with `expires_at = now + active_ttl`) when fewer than
    /// `active_limit` entries are currently queued, else Waiting. The
    /// session token is bound to the entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn join(
        &self,
        event_id: EventId,
        user_id: UserId,
        session_id: &str,
        active_limit: usize,
        active_ttl: Duration,
    ) -> impl std::future::Future<Output = Result<QueueEntry>> + Send;

    /// Load a user's entry for an event.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user has no entry.
    fn entry_for_user(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<QueueEntry>> + Send;

    /// Resolve a session token to its queue entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the token is unknown.
    fn entry_for_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<QueueEntry>> + Send;

    /// Current queue length for an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn queue_length(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Pop the queue head into `popped_status` and promote the new head
    /// Waiting → Active with `expires_at = now + active_ttl`.
    ///
    /// # Returns
    ///
    /// The newly Active entry, or `None` when the queue has no further
    /// entries to promote.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn activate_next(
        &self,
        event_id: EventId,
        popped_status: QueueStatus,
        active_ttl: Duration,
    ) -> impl std::future::Future<Output = Result<Option<QueueEntry>>> + Send;

    /// Overwrite an entry (session refresh, sweep bookkeeping) and keep
    /// the expiry index in step with `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn update(&self, entry: &QueueEntry) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Entries of one event currently Active and inside their window.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn active_entries(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<QueueEntry>>> + Send;

    /// Active entries whose deadline is at or before `now`, oldest first.
    /// Input to the expiry sweep.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn expired_entries(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<QueueEntry>>> + Send;
}
