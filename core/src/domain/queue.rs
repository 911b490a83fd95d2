//! Admission-queue entry.

use super::{EventId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// In line, not yet admitted.
    Waiting,
    /// Admitted to purchase until `expires_at`.
    Active,
    /// Active window elapsed without completion; terminal.
    Expired,
    /// Left the queue after being processed; terminal.
    Completed,
}

/// A buyer's place in an event's admission queue.
///
/// `position` is the insertion rank: it is assigned once when the entry
/// joins and never renumbered as the head of the queue pops. Wait estimates
/// are derived from it rather than from a live rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Entry id.
    pub id: Uuid,
    /// Event being queued for.
    pub event_id: EventId,
    /// Waiting buyer. At most one non-terminal entry per user per event.
    pub user_id: UserId,
    /// Opaque session token supplied by the caller at join time.
    pub session_id: String,
    /// Insertion rank, 1-based.
    pub position: u64,
    /// Current state.
    pub status: QueueStatus,
    /// When the buyer joined.
    pub entered_at: DateTime<Utc>,
    /// Active-window deadline. Present iff the entry is Active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether the entry is still in line.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.status == QueueStatus::Waiting
    }

    /// Whether the entry is admitted to purchase.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == QueueStatus::Active
    }

    /// Whether the entry reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, QueueStatus::Expired | QueueStatus::Completed)
    }

    /// Whether the Active window has elapsed.
    ///
    /// Entries without a deadline (Waiting or terminal) never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Utc::now() > deadline,
            None => false,
        }
    }

    /// Estimated wait derived from the insertion rank.
    #[must_use]
    pub fn estimated_wait(&self, avg_processing_time: Duration) -> Duration {
        if self.is_active() || self.position == 0 {
            return Duration::zero();
        }
        avg_processing_time * (self.position.saturating_sub(1) as i32)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn entry(position: u64, status: QueueStatus) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            id: Uuid::new_v4(),
            event_id: EventId::new(),
            user_id: UserId::new(),
            session_id: "s1".into(),
            position,
            status,
            entered_at: now,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_entries_have_zero_wait() {
        let e = entry(1, QueueStatus::Active);
        assert_eq!(e.estimated_wait(Duration::minutes(5)), Duration::zero());
    }

    #[test]
    fn wait_scales_with_rank_ahead() {
        let e = entry(4, QueueStatus::Waiting);
        assert_eq!(e.estimated_wait(Duration::minutes(5)), Duration::minutes(15));
    }

    #[test]
    fn expiry_applies_only_with_deadline() {
        let mut e = entry(1, QueueStatus::Active);
        assert!(!e.is_expired());
        e.expires_at = Some(Utc::now() - Duration::seconds(5));
        assert!(e.is_expired());
    }

    #[test]
    fn terminal_states() {
        assert!(entry(1, QueueStatus::Completed).is_terminal());
        assert!(entry(1, QueueStatus::Expired).is_terminal());
        assert!(!entry(1, QueueStatus::Active).is_terminal());
        assert!(!entry(1, QueueStatus::Waiting).is_terminal());
    }
}
