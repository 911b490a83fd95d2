//! Infrastructure adapters: per-key mutex and read-through cache.

use crate::error::Result;
use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};

/// Store-backed per-key mutex with TTL.
///
/// `acquire` is try-lock semantics: it returns `false` immediately when
/// the key is held. Retry policy is the caller's concern. The TTL bounds
/// how long a crashed holder can block others; release and extend are
/// holder-guarded, so a holder whose lease was evicted by TTL cannot
/// disturb a successor's lock.
pub trait Lock: Send + Sync {
    /// Try to take the lock.
    ///
    /// # Returns
    ///
    /// `true` if this caller now holds the lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Release a held lock. A no-op if the lease already expired.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn release(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Push a held lock's expiry out by `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn extend(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Whether any holder currently owns the key.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on store failure.
    fn is_locked(&self, key: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Read-through cache with caller-supplied freshness bounds.
///
/// Only for listings (events, available-seat snapshots, queue lengths):
/// a stale read there costs nothing. Inventory decisions always go to the
/// store.
pub trait Cache: Send + Sync {
    /// Look up a cached value. `None` on miss or expiry.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the cached bytes do not decode as `T`.
    fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<T>>> + Send;

    /// Store a value with a freshness bound.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the value does not encode.
    fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Drop a cached value (invalidation after writes).
    ///
    /// # Errors
    ///
    /// Implementations should not fail on missing keys.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
