//! Admission-queue flows.

use crate::lock_guard::{acquire_with_retry, release_quietly};
use chrono::{Duration, Utc};
use turnstile_core::adapter::{Cache, Lock};
use turnstile_core::domain::{EventId, QueueEntry, QueueStatus, UserId};
use turnstile_core::repository::{EventRepository, QueueRepository};
use turnstile_core::{Error, Result, TicketingConfig};

fn queue_length_cache(event_id: EventId) -> String {
    format!("queue_length:{event_id}")
}

/// A queue entry together with its derived wait estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatusView {
    /// The entry itself.
    pub entry: QueueEntry,
    /// Estimated wait derived from the insertion rank.
    pub estimated_wait: Duration,
}

/// Queue admission flows: join, position, promotion, session refresh.
///
/// Join and promotion serialize on the per-event `queue_join:{event}` /
/// `queue_process:{event}` mutexes; every position a client observes is
/// consistent with join acknowledgement order.
#[derive(Debug, Clone)]
pub struct QueueService<Q, E, L, C> {
    queues: Q,
    events: E,
    lock: L,
    cache: C,
    config: TicketingConfig,
}

impl<Q, E, L, C> QueueService<Q, E, L, C>
where
    Q: QueueRepository,
    E: EventRepository,
    L: Lock,
    C: Cache,
{
    /// Wire a queue service over its stores.
    pub fn new(queues: Q, events: E, lock: L, cache: C, config: TicketingConfig) -> Self {
        Self {
            queues,
            events,
            lock,
            cache,
            config,
        }
    }

    /// Join an event's queue.
    ///
    /// Idempotent per user: re-joining returns the existing live entry.
    /// The first K joiners are admitted immediately; everyone else waits
    /// in FIFO order.
    ///
    /// # Errors
    ///
    /// - `EventUnavailable` if the event cannot sell tickets
    /// - `LockBusy` if the join mutex stays contended past the retry
    ///   budget
    pub async fn join_queue(
        &self,
        event_id: EventId,
        user_id: UserId,
        session_id: &str,
    ) -> Result<QueueEntry> {
        let event = self.events.get(event_id).await?;
        if !event.can_purchase() {
            tracing::warn!(event_id = %event_id, status = ?event.status, "join rejected, event unavailable");
            return Err(Error::EventUnavailable);
        }

        let resource = format!("queue_join:{event_id}");
        acquire_with_retry(
            &self.lock,
            &resource,
            self.config.queue_lock_ttl,
            &self.config.lock_retry,
        )
        .await?;

        let outcome = self
            .queues
            .join(
                event_id,
                user_id,
                session_id,
                self.config.active_concurrency,
                self.config.active_session_ttl,
            )
            .await;

        release_quietly(&self.lock, &resource).await;
        self.invalidate_length(event_id).await;
        outcome
    }

    /// A user's entry for an event.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user never joined.
    pub async fn queue_position(&self, event_id: EventId, user_id: UserId) -> Result<QueueEntry> {
        self.queues.entry_for_user(event_id, user_id).await
    }

    /// Resolve a session token to its entry plus a wait estimate.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown
    /// - `SessionInvalid` if the entry's Active window already elapsed
    pub async fn queue_status(&self, session_id: &str) -> Result<QueueStatusView> {
        let entry = self.queues.entry_for_session(session_id).await?;
        if entry.is_active() && entry.is_expired() {
            tracing::info!(session_id, entry_id = %entry.id, "queue session expired");
            return Err(Error::SessionInvalid);
        }

        let estimated_wait = entry.estimated_wait(self.config.avg_processing_time);
        Ok(QueueStatusView {
            entry,
            estimated_wait,
        })
    }

    /// Current queue length, cached for 30 seconds.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn queue_length(&self, event_id: EventId) -> Result<u64> {
        let cache_key = queue_length_cache(event_id);
        if let Ok(Some(cached)) = self.cache.get::<u64>(&cache_key).await {
            return Ok(cached);
        }

        let length = self.queues.queue_length(event_id).await?;
        if let Err(e) = self
            .cache
            .set(&cache_key, &length, Duration::seconds(30))
            .await
        {
            tracing::warn!(event_id = %event_id, error = %e, "failed to cache queue length");
        }
        Ok(length)
    }

    /// Pop the processed head and admit the next buyer.
    ///
    /// The popped entry is marked Completed; promotion happens under the
    /// `queue_process:{event}` mutex.
    ///
    /// # Returns
    ///
    /// The newly Active entry, or `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns `LockBusy` when the mutex stays contended past the retry
    /// budget, otherwise store errors.
    pub async fn process_next(&self, event_id: EventId) -> Result<Option<QueueEntry>> {
        self.promote(event_id, QueueStatus::Completed).await
    }

    /// Expire a stale Active entry and admit the next buyer.
    ///
    /// Sweep-driven counterpart of [`process_next`](Self::process_next):
    /// the entry is re-read under the mutex and skipped if a user flow
    /// already moved it on, so the sweep can never pop a live buyer.
    ///
    /// # Returns
    ///
    /// `true` if the entry was expired and the head popped.
    ///
    /// # Errors
    ///
    /// Returns `LockBusy` or store errors.
    pub async fn expire_entry(&self, entry: &QueueEntry) -> Result<bool> {
        let event_id = entry.event_id;
        let resource = format!("queue_process:{event_id}");
        acquire_with_retry(
            &self.lock,
            &resource,
            self.config.queue_lock_ttl,
            &self.config.lock_retry,
        )
        .await?;

        let outcome = async {
            let current = match self.queues.entry_for_user(event_id, entry.user_id).await {
                Ok(current) => current,
                Err(Error::NotFound { .. }) => return Ok(false),
                Err(e) => return Err(e),
            };
            if !current.is_active() || !current.is_expired() {
                return Ok(false);
            }

            tracing::info!(
                event_id = %event_id,
                user_id = %entry.user_id,
                "expiring stale active entry"
            );
            let promoted = self
                .queues
                .activate_next(
                    event_id,
                    QueueStatus::Expired,
                    self.config.active_session_ttl,
                )
                .await?;
            if let Some(promoted) = promoted {
                tracing::info!(
                    event_id = %event_id,
                    user_id = %promoted.user_id,
                    "promoted next buyer after expiry"
                );
            }
            Ok(true)
        }
        .await;

        release_quietly(&self.lock, &resource).await;
        self.invalidate_length(event_id).await;
        outcome
    }

    /// Reset an Active session's expiry to a full TTL from now.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown
    /// - `SessionInvalid` if the entry is not Active or already expired
    pub async fn refresh_session(&self, session_id: &str) -> Result<QueueEntry> {
        let mut entry = self.queues.entry_for_session(session_id).await?;
        if !entry.is_active() || entry.is_expired() {
            tracing::warn!(session_id, status = ?entry.status, "refresh rejected");
            return Err(Error::SessionInvalid);
        }

        entry.expires_at = Some(Utc::now() + self.config.active_session_ttl);
        self.queues.update(&entry).await?;

        tracing::info!(session_id, entry_id = %entry.id, "session refreshed");
        Ok(entry)
    }

    /// The buyers currently admitted for an event.
    ///
    /// With the default concurrency of one this is the queue head or
    /// empty; operators use it to watch admission health.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn active_entries(&self, event_id: EventId) -> Result<Vec<QueueEntry>> {
        self.queues.active_entries(event_id).await
    }

    /// Whether a user currently holds an unexpired Active entry.
    ///
    /// # Errors
    ///
    /// Returns store errors; an unknown user is simply not active.
    pub async fn is_user_active(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        match self.queues.entry_for_user(event_id, user_id).await {
            Ok(entry) => Ok(entry.is_active() && !entry.is_expired()),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn promote(
        &self,
        event_id: EventId,
        popped_status: QueueStatus,
    ) -> Result<Option<QueueEntry>> {
        let resource = format!("queue_process:{event_id}");
        acquire_with_retry(
            &self.lock,
            &resource,
            self.config.queue_lock_ttl,
            &self.config.lock_retry,
        )
        .await?;

        let outcome = self
            .queues
            .activate_next(event_id, popped_status, self.config.active_session_ttl)
            .await;

        release_quietly(&self.lock, &resource).await;
        self.invalidate_length(event_id).await;

        if let Ok(Some(entry)) = &outcome {
            tracing::info!(
                event_id = %event_id,
                user_id = %entry.user_id,
                session_id = %entry.session_id,
                "queue processed"
            );
        }
        outcome
    }

    async fn invalidate_length(&self, event_id: EventId) {
        if let Err(e) = self.cache.delete(&queue_length_cache(event_id)).await {
            tracing::warn!(event_id = %event_id, error = %e, "failed to invalidate queue length cache");
        }
    }
}
