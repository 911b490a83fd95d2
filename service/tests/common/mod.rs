//! Shared wiring for coordinator tests: all services over the in-memory
//! stores.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use turnstile_core::{LockRetryPolicy, TicketingConfig};
use turnstile_service::{EventService, NewEvent, QueueService, Sweeper, TicketingService};
use turnstile_testing::{
    MemoryCache, MemoryEventRepository, MemoryLock, MemoryQueueRepository, MemorySeatRepository,
    MemoryTicketRepository,
};

pub type Events = EventService<MemoryEventRepository, MemorySeatRepository, MemoryCache>;
pub type Queues =
    QueueService<MemoryQueueRepository, MemoryEventRepository, MemoryLock, MemoryCache>;
pub type Ticketing = TicketingService<
    MemoryTicketRepository,
    MemoryEventRepository,
    MemorySeatRepository,
    MemoryQueueRepository,
    MemoryLock,
>;
pub type Sweep = Sweeper<
    MemoryTicketRepository,
    MemoryEventRepository,
    MemorySeatRepository,
    MemoryQueueRepository,
    MemoryLock,
    MemoryCache,
>;

/// Full backend over memory stores. Repositories are exposed alongside
/// the services so tests can stage states (expired deadlines) directly.
pub struct Backend {
    pub event_repo: MemoryEventRepository,
    pub seat_repo: MemorySeatRepository,
    pub ticket_repo: MemoryTicketRepository,
    pub queue_repo: MemoryQueueRepository,
    pub lock: MemoryLock,
    pub events: Events,
    pub queues: Queues,
    pub ticketing: Ticketing,
    pub sweeper: Sweep,
}

pub fn backend(config: TicketingConfig) -> Backend {
    let event_repo = MemoryEventRepository::new();
    let seat_repo = MemorySeatRepository::new();
    let ticket_repo = MemoryTicketRepository::new();
    let queue_repo = MemoryQueueRepository::new();
    let lock = MemoryLock::new();
    let cache = MemoryCache::new();

    let events = EventService::new(event_repo.clone(), seat_repo.clone(), cache.clone());
    let queues = QueueService::new(
        queue_repo.clone(),
        event_repo.clone(),
        lock.clone(),
        cache.clone(),
        config.clone(),
    );
    let ticketing = TicketingService::new(
        ticket_repo.clone(),
        event_repo.clone(),
        seat_repo.clone(),
        queue_repo.clone(),
        lock.clone(),
        config,
    );
    let sweeper = Sweeper::new(
        ticket_repo.clone(),
        queue_repo.clone(),
        ticketing.clone(),
        queues.clone(),
    );

    Backend {
        event_repo,
        seat_repo,
        ticket_repo,
        queue_repo,
        lock,
        events,
        queues,
        ticketing,
        sweeper,
    }
}

/// Config tuned for tests: production semantics, millisecond backoffs.
pub fn test_config() -> TicketingConfig {
    TicketingConfig::default().with_lock_retry(LockRetryPolicy {
        max_attempts: 5,
        initial_delay: std::time::Duration::from_millis(1),
        multiplier: 2.0,
    })
}

pub fn standing_event(total: i64) -> NewEvent {
    NewEvent {
        name: "Standing Show".into(),
        description: "General admission".into(),
        venue: "Main Hall".into(),
        start_time: Utc::now() + Duration::hours(1),
        end_time: Utc::now() + Duration::hours(5),
        total_tickets: total,
        is_seated: false,
    }
}

pub fn new_seat(section: &str, row: &str, number: &str, price: i64) -> turnstile_service::NewSeat {
    turnstile_service::NewSeat {
        section: section.into(),
        row: row.into(),
        number: number.into(),
        price,
    }
}

pub fn seated_event(total: i64) -> NewEvent {
    NewEvent {
        name: "Seated Show".into(),
        description: "Reserved seating".into(),
        venue: "Opera House".into(),
        start_time: Utc::now() + Duration::hours(1),
        end_time: Utc::now() + Duration::hours(5),
        total_tickets: total,
        is_seated: true,
    }
}
