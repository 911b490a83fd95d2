//! Expiry sweep.
//!
//! The sweep is the convergence mechanism behind every "best-effort" in
//! the purchase path: reservations that were never confirmed go back to
//! inventory, and Active queue entries whose buyer walked away stop
//! blocking the line. It is idempotent and safe to run concurrently with
//! user flows: every mutation happens through the same mutex-guarded
//! or atomic paths user traffic uses.

use crate::queue::QueueService;
use crate::ticketing::TicketingService;
use chrono::Utc;
use turnstile_core::adapter::{Cache, Lock};
use turnstile_core::repository::{
    EventRepository, QueueRepository, SeatRepository, TicketRepository,
};
use turnstile_core::{Error, Result};

/// What one sweep pass reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired reservations cancelled back to inventory.
    pub cancelled_reservations: usize,
    /// Stale Active queue entries expired (with the next buyer promoted).
    pub expired_sessions: usize,
}

impl SweepReport {
    /// Whether the pass changed anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cancelled_reservations == 0 && self.expired_sessions == 0
    }
}

/// Periodic reconciliation pass. Scheduling is the deployment's concern
/// ([`run`](Self::run) is a convenience loop); [`run_once`](Self::run_once)
/// is the unit of work.
#[derive(Debug, Clone)]
pub struct Sweeper<T, E, S, Q, L, C> {
    tickets: T,
    queues: Q,
    ticketing: TicketingService<T, E, S, Q, L>,
    queue_service: QueueService<Q, E, L, C>,
}

impl<T, E, S, Q, L, C> Sweeper<T, E, S, Q, L, C>
where
    T: TicketRepository,
    E: EventRepository,
    S: SeatRepository,
    Q: QueueRepository,
    L: Lock,
    C: Cache,
{
    /// Wire a sweeper over the repositories and the flows it reuses.
    pub fn new(
        tickets: T,
        queues: Q,
        ticketing: TicketingService<T, E, S, Q, L>,
        queue_service: QueueService<Q, E, L, C>,
    ) -> Self {
        Self {
            tickets,
            queues,
            ticketing,
            queue_service,
        }
    }

    /// One full reconciliation pass over both expiry indices.
    ///
    /// # Errors
    ///
    /// Returns store errors from the index scans; per-item failures are
    /// logged and skipped so one stuck entity cannot stall the sweep.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        for ticket in self.tickets.expired_reservations(now).await? {
            match self.ticketing.cancel(ticket.id).await {
                Ok(_) => {
                    tracing::info!(ticket_id = %ticket.id, "swept expired reservation");
                    report.cancelled_reservations += 1;
                }
                // A user flow got there first; nothing left to reconcile.
                Err(Error::AlreadyCancelled) => {}
                Err(e) => {
                    tracing::error!(ticket_id = %ticket.id, error = %e, "failed to sweep reservation");
                }
            }
        }

        for entry in self.queues.expired_entries(now).await? {
            match self.queue_service.expire_entry(&entry).await {
                Ok(true) => report.expired_sessions += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        entry_id = %entry.id,
                        event_id = %entry.event_id,
                        error = %e,
                        "failed to sweep queue entry"
                    );
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                cancelled_reservations = report.cancelled_reservations,
                expired_sessions = report.expired_sessions,
                "sweep pass complete"
            );
        }
        Ok(report)
    }

    /// Run sweep passes on a fixed period until the task is dropped.
    pub async fn run(self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "sweep pass failed");
            }
        }
    }
}
