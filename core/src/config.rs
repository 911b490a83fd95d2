//! Ticketing configuration.
//!
//! Values should be provided by the application; the defaults here match
//! the production deployment.

use chrono::Duration;

/// Backoff policy for per-resource mutex acquisition.
///
/// A contended mutex is retried `max_attempts` times with exponentially
/// growing delays before the flow fails with `LockBusy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockRetryPolicy {
    /// Total acquisition attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: std::time::Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl LockRetryPolicy {
    /// Delay to sleep after the given zero-based failed attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        std::time::Duration::from_millis(millis as u64)
    }
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(50),
            multiplier: 2.0,
        }
    }
}

/// Configuration for the admission queue and purchase flows.
#[derive(Debug, Clone)]
pub struct TicketingConfig {
    /// How long a promoted queue entry stays Active before it expires.
    ///
    /// Default: 15 minutes
    pub active_session_ttl: Duration,

    /// How long a Reserved ticket holds inventory before the sweep
    /// returns it.
    ///
    /// Default: 15 minutes
    pub reservation_ttl: Duration,

    /// Price of a standing ticket in integer minor units.
    ///
    /// Default: 5000
    pub standing_ticket_price: i64,

    /// Number of queue entries admitted to purchase at once.
    ///
    /// Default: 1
    pub active_concurrency: usize,

    /// Average time one admitted buyer takes, used for wait estimates.
    ///
    /// Default: 5 minutes
    pub avg_processing_time: Duration,

    /// TTL on the `purchase:*` mutexes.
    ///
    /// Default: 10 seconds
    pub purchase_lock_ttl: Duration,

    /// TTL on the `queue_join:*` / `queue_process:*` mutexes.
    ///
    /// Default: 5 seconds
    pub queue_lock_ttl: Duration,

    /// Backoff policy for mutex acquisition.
    pub lock_retry: LockRetryPolicy,
}

impl TicketingConfig {
    /// Create a configuration with production defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Active queue-entry TTL.
    #[must_use]
    pub const fn with_active_session_ttl(mut self, ttl: Duration) -> Self {
        self.active_session_ttl = ttl;
        self
    }

    /// Set the reservation TTL.
    #[must_use]
    pub const fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    /// Set the standing ticket price (minor units).
    #[must_use]
    pub const fn with_standing_ticket_price(mut self, price: i64) -> Self {
        self.standing_ticket_price = price;
        self
    }

    /// Set how many buyers are admitted concurrently.
    #[must_use]
    pub const fn with_active_concurrency(mut self, k: usize) -> Self {
        self.active_concurrency = k;
        self
    }

    /// Set the average processing time used for wait estimates.
    #[must_use]
    pub const fn with_avg_processing_time(mut self, avg: Duration) -> Self {
        self.avg_processing_time = avg;
        self
    }

    /// Set the purchase-mutex TTL.
    #[must_use]
    pub const fn with_purchase_lock_ttl(mut self, ttl: Duration) -> Self {
        self.purchase_lock_ttl = ttl;
        self
    }

    /// Set the queue-mutex TTL.
    #[must_use]
    pub const fn with_queue_lock_ttl(mut self, ttl: Duration) -> Self {
        self.queue_lock_ttl = ttl;
        self
    }

    /// Set the mutex retry policy.
    #[must_use]
    pub const fn with_lock_retry(mut self, policy: LockRetryPolicy) -> Self {
        self.lock_retry = policy;
        self
    }
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            active_session_ttl: Duration::minutes(15),
            reservation_ttl: Duration::minutes(15),
            standing_ticket_price: 5000,
            active_concurrency: 1,
            avg_processing_time: Duration::minutes(5),
            purchase_lock_ttl: Duration::seconds(10),
            queue_lock_ttl: Duration::seconds(5),
            lock_retry: LockRetryPolicy::default(),
        }
    }
}
