//! Bounded-backoff mutex acquisition.

use chrono::Duration;
use turnstile_core::adapter::Lock;
use turnstile_core::{Error, LockRetryPolicy, Result};

/// Acquire a per-resource mutex, retrying with exponential backoff.
///
/// Fails with `LockBusy` once the policy's attempts are exhausted, which
/// bounds how long any flow can wait on contention.
pub(crate) async fn acquire_with_retry<L: Lock>(
    lock: &L,
    resource: &str,
    ttl: Duration,
    policy: &LockRetryPolicy,
) -> Result<()> {
    for attempt in 0..policy.max_attempts {
        if lock.acquire(resource, ttl).await? {
            return Ok(());
        }
        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
        }
    }

    tracing::warn!(resource = %resource, "lock contended past retry budget");
    Err(Error::LockBusy {
        resource: resource.to_string(),
    })
}

/// Release a mutex after a flow, keeping the flow's own result.
///
/// A failed release is logged and swallowed: the TTL reclaims the lease,
/// and the flow outcome must not be overwritten by cleanup noise.
pub(crate) async fn release_quietly<L: Lock>(lock: &L, resource: &str) {
    if let Err(e) = lock.release(resource).await {
        tracing::error!(resource = %resource, error = %e, "failed to release lock");
    }
}
