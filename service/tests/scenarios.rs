//! End-to-end coordinator flows over the in-memory backend.

mod common;

use chrono::{Duration, Utc};
use common::{backend, seated_event, standing_event, test_config};
use turnstile_core::domain::{QueueStatus, SeatStatus, TicketStatus, UserId};
use turnstile_core::repository::{EventRepository, SeatRepository};
use turnstile_core::Error;

/// Standing on-sale: two tickets, three buyers, strict admission order.
#[tokio::test]
async fn standing_event_full_lifecycle() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(2)).await.unwrap();
    let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());

    // U1 is admitted immediately; U2 waits behind them.
    let e1 = b.queues.join_queue(event.id, u1, "s1").await.unwrap();
    assert_eq!(e1.position, 1);
    assert_eq!(e1.status, QueueStatus::Active);

    let e2 = b.queues.join_queue(event.id, u2, "s2").await.unwrap();
    assert_eq!(e2.position, 2);
    assert_eq!(e2.status, QueueStatus::Waiting);

    // U1 reserves one of the two tickets.
    let t1 = b.ticketing.purchase(event.id, u1, None, "s1").await.unwrap();
    assert_eq!(t1.status, TicketStatus::Reserved);
    assert!(t1.expires_at.is_some());
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );

    // Confirmation does not move the counter again.
    let confirmed = b.ticketing.confirm(t1.id).await.unwrap();
    assert_eq!(confirmed.status, TicketStatus::Confirmed);
    assert_eq!(confirmed.expires_at, None);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );

    // U2 is promoted and takes the last ticket.
    let promoted = b.queues.process_next(event.id).await.unwrap().unwrap();
    assert_eq!(promoted.user_id, u2);
    assert_eq!(promoted.status, QueueStatus::Active);

    let t2 = b.ticketing.purchase(event.id, u2, None, "s2").await.unwrap();
    assert_eq!(t2.status, TicketStatus::Reserved);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        0
    );

    // U3 joins after one pop: waiting, and the position is the insertion
    // rank, not the live list length.
    let e3 = b.queues.join_queue(event.id, u3, "s3").await.unwrap();
    assert_eq!(e3.status, QueueStatus::Waiting);
    assert_eq!(e3.position, 3);

    // Purchasing without being admitted is rejected.
    assert_eq!(
        b.ticketing.purchase(event.id, u3, None, "s3").await,
        Err(Error::SessionInvalid)
    );
}

/// Seated event: contested seat, cancellation, re-sale.
#[tokio::test]
async fn seated_event_reserve_cancel_resell() {
    let config = test_config().with_active_concurrency(3);
    let b = backend(config);
    let event = b.events.create_event(seated_event(2)).await.unwrap();
    let created = b
        .events
        .create_seats(
            event.id,
            vec![
                common::new_seat("A", "1", "1", 7500),
                common::new_seat("A", "1", "2", 7500),
            ],
        )
        .await
        .unwrap();
    assert_eq!(created, 2);

    let mut seats = b.seat_repo.seats_for_event(event.id).await.unwrap();
    seats.sort_by(|x, y| x.number.cmp(&y.number));
    let (a1, a2) = (seats[0].clone(), seats[1].clone());

    let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
    for (user, session) in [(u1, "s1"), (u2, "s2"), (u3, "s3")] {
        let entry = b.queues.join_queue(event.id, user, session).await.unwrap();
        assert_eq!(entry.status, QueueStatus::Active);
    }

    // U1 takes A1.
    let t1 = b
        .ticketing
        .purchase(event.id, u1, Some(a1.id), "s1")
        .await
        .unwrap();
    assert_eq!(t1.price, 7500);
    assert_eq!(b.seat_repo.get(a1.id).await.unwrap().status, SeatStatus::Reserved);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );

    // U2 races for the same seat and loses, then takes A2.
    assert_eq!(
        b.ticketing.purchase(event.id, u2, Some(a1.id), "s2").await,
        Err(Error::SeatUnavailable)
    );
    let t2 = b
        .ticketing
        .purchase(event.id, u2, Some(a2.id), "s2")
        .await
        .unwrap();
    assert_eq!(t2.status, TicketStatus::Reserved);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        0
    );

    // U1 cancels; the seat and the counter come back.
    b.ticketing.cancel(t1.id).await.unwrap();
    assert_eq!(b.seat_repo.get(a1.id).await.unwrap().status, SeatStatus::Available);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );

    // U3 can now take the freed seat.
    let t3 = b
        .ticketing
        .purchase(event.id, u3, Some(a1.id), "s3")
        .await
        .unwrap();
    assert_eq!(t3.status, TicketStatus::Reserved);
    assert_eq!(b.seat_repo.get(a1.id).await.unwrap().status, SeatStatus::Reserved);
}

/// Confirmed seated ticket: seat goes Sold, cancellation releases it.
#[tokio::test]
async fn cancel_after_confirmation_frees_sold_seat() {
    let b = backend(test_config());
    let event = b.events.create_event(seated_event(1)).await.unwrap();
    b.events
        .create_seats(event.id, vec![common::new_seat("B", "2", "7", 9000)])
        .await
        .unwrap();
    let seat = b.seat_repo.seats_for_event(event.id).await.unwrap()[0].clone();

    let user = UserId::new();
    b.queues.join_queue(event.id, user, "s1").await.unwrap();
    let ticket = b
        .ticketing
        .purchase(event.id, user, Some(seat.id), "s1")
        .await
        .unwrap();

    b.ticketing.confirm(ticket.id).await.unwrap();
    assert_eq!(b.seat_repo.get(seat.id).await.unwrap().status, SeatStatus::Sold);

    b.ticketing.cancel(ticket.id).await.unwrap();
    assert_eq!(b.seat_repo.get(seat.id).await.unwrap().status, SeatStatus::Available);
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );

    // Repeat cancellation fails and moves no inventory.
    assert_eq!(
        b.ticketing.cancel(ticket.id).await,
        Err(Error::AlreadyCancelled)
    );
    assert_eq!(
        b.event_repo.get(event.id).await.unwrap().available_tickets,
        1
    );
}

/// Session refresh extends the Active window and keeps purchase working.
#[tokio::test]
async fn refresh_extends_active_session() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(5)).await.unwrap();
    let user = UserId::new();

    let entry = b.queues.join_queue(event.id, user, "s1").await.unwrap();
    assert_eq!(entry.status, QueueStatus::Active);

    // Age the session: five minutes left on the window.
    let mut aged = entry.clone();
    aged.expires_at = Some(Utc::now() + Duration::minutes(5));
    b.queue_repo.put(&aged).unwrap();

    let refreshed = b.queues.refresh_session("s1").await.unwrap();
    let deadline = refreshed.expires_at.unwrap();
    assert!(deadline > Utc::now() + Duration::minutes(14));

    let ticket = b.ticketing.purchase(event.id, user, None, "s1").await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Reserved);
}

/// Refreshing a Waiting or expired session is rejected.
#[tokio::test]
async fn refresh_requires_live_active_session() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(5)).await.unwrap();
    let (u1, u2) = (UserId::new(), UserId::new());

    b.queues.join_queue(event.id, u1, "s1").await.unwrap();
    let waiting = b.queues.join_queue(event.id, u2, "s2").await.unwrap();
    assert_eq!(waiting.status, QueueStatus::Waiting);
    assert_eq!(
        b.queues.refresh_session("s2").await,
        Err(Error::SessionInvalid)
    );

    // An Active entry past its window cannot refresh either.
    let active = b.queues.queue_position(event.id, u1).await.unwrap();
    let mut stale = active.clone();
    stale.expires_at = Some(Utc::now() - Duration::seconds(1));
    b.queue_repo.put(&stale).unwrap();
    assert_eq!(
        b.queues.refresh_session("s1").await,
        Err(Error::SessionInvalid)
    );
}

/// Queue status reports the wait estimate; join is idempotent per user.
#[tokio::test]
async fn queue_status_and_idempotent_join() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(10)).await.unwrap();
    let (u1, u2) = (UserId::new(), UserId::new());

    let first = b.queues.join_queue(event.id, u1, "s1").await.unwrap();
    let again = b.queues.join_queue(event.id, u1, "s1").await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(b.queues.queue_length(event.id).await.unwrap(), 1);

    b.queues.join_queue(event.id, u2, "s2").await.unwrap();
    let status = b.queues.queue_status("s2").await.unwrap();
    assert_eq!(status.entry.position, 2);
    assert_eq!(status.estimated_wait, Duration::minutes(5));

    let active_status = b.queues.queue_status("s1").await.unwrap();
    assert_eq!(active_status.estimated_wait, Duration::zero());

    assert!(b.queues.is_user_active(event.id, u1).await.unwrap());
    assert!(!b.queues.is_user_active(event.id, u2).await.unwrap());
}

/// Purchase gates: wrong event, wrong user, inactive event.
#[tokio::test]
async fn purchase_session_gates() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(5)).await.unwrap();
    let other = b.events.create_event(standing_event(5)).await.unwrap();
    let (u1, u2) = (UserId::new(), UserId::new());

    b.queues.join_queue(event.id, u1, "s1").await.unwrap();

    // Session bound to a different event.
    assert_eq!(
        b.ticketing.purchase(other.id, u1, None, "s1").await,
        Err(Error::SessionInvalid)
    );
    // Session bound to a different user.
    assert_eq!(
        b.ticketing.purchase(event.id, u2, None, "s1").await,
        Err(Error::SessionInvalid)
    );
    // Unknown session token.
    assert_eq!(
        b.ticketing.purchase(event.id, u1, None, "nope").await,
        Err(Error::SessionInvalid)
    );
}

/// At most one entry per event is Active at any point of the flow
/// (default admission concurrency).
#[tokio::test]
async fn single_active_admission_invariant() {
    let b = backend(test_config());
    let event = b.events.create_event(standing_event(10)).await.unwrap();
    let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();

    for (i, user) in users.iter().enumerate() {
        b.queues
            .join_queue(event.id, *user, &format!("inv-{i}"))
            .await
            .unwrap();
        let active = b.queues.active_entries(event.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, users[0]);
    }

    // Each promotion keeps the active set at exactly one until the queue
    // drains.
    for expected in users.iter().skip(1) {
        let promoted = b.queues.process_next(event.id).await.unwrap().unwrap();
        assert_eq!(promoted.user_id, *expected);
        let active = b.queues.active_entries(event.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, *expected);
    }

    assert_eq!(b.queues.process_next(event.id).await.unwrap(), None);
    assert!(b.queues.active_entries(event.id).await.unwrap().is_empty());
}

/// Event validation rejects malformed input.
#[tokio::test]
async fn event_validation() {
    let b = backend(test_config());

    let mut no_name = standing_event(10);
    no_name.name = "   ".into();
    assert!(matches!(
        b.events.create_event(no_name).await,
        Err(Error::InvalidArgument(_))
    ));

    let mut backwards = standing_event(10);
    backwards.end_time = backwards.start_time - Duration::hours(1);
    assert!(matches!(
        b.events.create_event(backwards).await,
        Err(Error::InvalidArgument(_))
    ));

    let mut negative = standing_event(-1);
    negative.total_tickets = -1;
    assert!(matches!(
        b.events.create_event(negative).await,
        Err(Error::InvalidArgument(_))
    ));

    // Seats on a standing event are rejected.
    let standing = b.events.create_event(standing_event(10)).await.unwrap();
    assert!(matches!(
        b.events
            .create_seats(standing.id, vec![common::new_seat("A", "1", "1", 100)])
            .await,
        Err(Error::InvalidArgument(_))
    ));
}
