//! Redis seat repository.

use crate::client::{encode_err, store_err, RedisStore};
use crate::keys;
use chrono::{SecondsFormat, Utc};
use redis::AsyncCommands;
use turnstile_core::domain::{EventId, Seat, SeatId, SeatStatus};
use turnstile_core::repository::SeatRepository;
use turnstile_core::{Error, Result};

/// All-or-nothing Available → Reserved over the enumerated seat keys.
/// Seats are validated in the given order before any write, so the first
/// offending seat determines the result and a failure mutates nothing.
const RESERVE_SCRIPT: &str = r#"
    local seats = {}
    for i, seat_key in ipairs(KEYS) do
        local raw = redis.call('GET', seat_key)
        if raw == false then
            return 'seat_not_found'
        end

        local seat = cjson.decode(raw)
        if seat.status ~= 'available' then
            return 'seat_not_available'
        end

        seat.status = 'reserved'
        seat.updated_at = ARGV[1]
        seats[i] = seat
    end

    for i, seat_key in ipairs(KEYS) do
        local seat = seats[i]
        redis.call('SET', seat_key, cjson.encode(seat))
        redis.call('SREM', 'event_seats:' .. seat.event_id .. ':available', seat.id)
    end

    return 'ok'
"#;

/// All-or-nothing release back to Available. Requires Reserved; with
/// ARGV[2] == '1' also accepts Sold (cancellation after confirmation).
const RELEASE_SCRIPT: &str = r#"
    local allow_sold = ARGV[2] == '1'
    local seats = {}
    for i, seat_key in ipairs(KEYS) do
        local raw = redis.call('GET', seat_key)
        if raw == false then
            return 'seat_not_found'
        end

        local seat = cjson.decode(raw)
        if seat.status ~= 'reserved' and not (allow_sold and seat.status == 'sold') then
            return 'seat_not_reserved'
        end

        seat.status = 'available'
        seat.updated_at = ARGV[1]
        seats[i] = seat
    end

    for i, seat_key in ipairs(KEYS) do
        local seat = seats[i]
        redis.call('SET', seat_key, cjson.encode(seat))
        redis.call('SADD', 'event_seats:' .. seat.event_id .. ':available', seat.id)
    end

    return 'ok'
"#;

/// Reserved → Sold for a single seat.
const MARK_SOLD_SCRIPT: &str = r#"
    local raw = redis.call('GET', KEYS[1])
    if raw == false then
        return 'seat_not_found'
    end

    local seat = cjson.decode(raw)
    if seat.status ~= 'reserved' then
        return 'seat_not_reserved'
    end

    seat.status = 'sold'
    seat.updated_at = ARGV[1]
    redis.call('SET', KEYS[1], cjson.encode(seat))
    return 'ok'
"#;

fn seat_script_err(code: &str) -> Error {
    match code {
        "seat_not_found" => Error::NotFound { entity: "seat" },
        "seat_not_available" => Error::SeatUnavailable,
        "seat_not_reserved" => Error::SeatNotReserved,
        other => Error::StoreUnavailable(format!("unexpected seat script result: {other}")),
    }
}

fn script_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Seat storage and the seat state machine.
#[derive(Debug, Clone)]
pub struct RedisSeatRepository {
    store: RedisStore,
}

impl RedisSeatRepository {
    /// Create a repository over a shared store handle.
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: SeatId) -> Result<Seat> {
        self.store
            .get_json(&keys::seat(id))
            .await?
            .ok_or(Error::NotFound { entity: "seat" })
    }

    async fn load_members(&self, members: Vec<String>) -> Result<Vec<Seat>> {
        let mut seats = Vec::with_capacity(members.len());
        for member in members {
            let Ok(id) = member.parse::<SeatId>() else {
                continue;
            };
            match self.load(id).await {
                Ok(seat) => seats.push(seat),
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(seats)
    }
}

impl SeatRepository for RedisSeatRepository {
    async fn create(&self, seat: &Seat) -> Result<()> {
        let data = serde_json::to_string(seat).map_err(encode_err)?;
        let member = seat.id.to_string();
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(keys::seat(seat.id), data)
            .ignore()
            .sadd(keys::event_seats(seat.event_id), &member)
            .ignore()
            .sadd(
                keys::event_seats_section(seat.event_id, &seat.section),
                &member,
            )
            .ignore();
        if seat.status == SeatStatus::Available {
            pipe.sadd(keys::event_seats_available(seat.event_id), &member)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(())
    }

    async fn create_batch(&self, seats: &[Seat]) -> Result<usize> {
        for seat in seats {
            self.create(seat).await?;
        }
        tracing::info!(count = seats.len(), "created seat batch");
        Ok(seats.len())
    }

    async fn get(&self, id: SeatId) -> Result<Seat> {
        self.load(id).await
    }

    async fn seats_for_event(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .smembers(keys::event_seats(event_id))
            .await
            .map_err(store_err)?;
        self.load_members(members).await
    }

    async fn available_seats(&self, event_id: EventId) -> Result<Vec<Seat>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .smembers(keys::event_seats_available(event_id))
            .await
            .map_err(store_err)?;
        self.load_members(members).await
    }

    async fn seats_in_section(&self, event_id: EventId, section: &str) -> Result<Vec<Seat>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .smembers(keys::event_seats_section(event_id, section))
            .await
            .map_err(store_err)?;
        self.load_members(members).await
    }

    async fn reserve_seats(&self, seat_ids: &[SeatId]) -> Result<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.store.conn();
        let script = redis::Script::new(RESERVE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for id in seat_ids {
            invocation.key(keys::seat(*id));
        }
        let outcome: String = invocation
            .arg(script_now())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if outcome == "ok" {
            tracing::debug!(count = seat_ids.len(), "reserved seats");
            Ok(())
        } else {
            Err(seat_script_err(&outcome))
        }
    }

    async fn release_seats(&self, seat_ids: &[SeatId], allow_sold: bool) -> Result<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.store.conn();
        let script = redis::Script::new(RELEASE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for id in seat_ids {
            invocation.key(keys::seat(*id));
        }
        let outcome: String = invocation
            .arg(script_now())
            .arg(if allow_sold { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if outcome == "ok" {
            tracing::debug!(count = seat_ids.len(), allow_sold, "released seats");
            Ok(())
        } else {
            Err(seat_script_err(&outcome))
        }
    }

    async fn mark_sold(&self, seat_id: SeatId) -> Result<()> {
        let mut conn = self.store.conn();
        let outcome: String = redis::Script::new(MARK_SOLD_SCRIPT)
            .key(keys::seat(seat_id))
            .arg(script_now())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        if outcome == "ok" {
            Ok(())
        } else {
            Err(seat_script_err(&outcome))
        }
    }

    async fn delete_for_event(&self, event_id: EventId) -> Result<()> {
        let seats = self.seats_for_event(event_id).await?;
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for seat in &seats {
            let member = seat.id.to_string();
            pipe.del(keys::seat(seat.id))
                .ignore()
                .srem(keys::event_seats(event_id), &member)
                .ignore()
                .srem(keys::event_seats_section(event_id, &seat.section), &member)
                .ignore()
                .srem(keys::event_seats_available(event_id), &member)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;

        tracing::info!(event_id = %event_id, count = seats.len(), "deleted event seats");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn script_error_mapping() {
        assert_eq!(
            seat_script_err("seat_not_found"),
            Error::NotFound { entity: "seat" }
        );
        assert_eq!(seat_script_err("seat_not_available"), Error::SeatUnavailable);
        assert_eq!(seat_script_err("seat_not_reserved"), Error::SeatNotReserved);
    }

    // Requires a running Redis instance:
    //   docker run -d -p 6379:6379 redis:7-alpine

    fn sample_seat(event_id: EventId) -> Seat {
        let now = Utc::now();
        Seat {
            id: SeatId::new(),
            event_id,
            section: "A".into(),
            row: "1".into(),
            number: "1".into(),
            price: 7500,
            status: SeatStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn reserve_is_all_or_nothing() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisSeatRepository::new(store);
        let event_id = EventId::new();

        let free = sample_seat(event_id);
        let taken = sample_seat(event_id);
        repo.create(&free).await.unwrap();
        repo.create(&taken).await.unwrap();
        repo.reserve_seats(&[taken.id]).await.unwrap();

        // Second reservation names one Available and one Reserved seat;
        // the Available one must stay untouched.
        assert_eq!(
            repo.reserve_seats(&[free.id, taken.id]).await,
            Err(Error::SeatUnavailable)
        );
        assert_eq!(repo.get(free.id).await.unwrap().status, SeatStatus::Available);

        let available = repo.available_seats(event_id).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, free.id);

        repo.delete_for_event(event_id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn sold_seats_release_only_when_allowed() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisSeatRepository::new(store);
        let event_id = EventId::new();

        let seat = sample_seat(event_id);
        repo.create(&seat).await.unwrap();
        repo.reserve_seats(&[seat.id]).await.unwrap();
        repo.mark_sold(seat.id).await.unwrap();

        assert_eq!(
            repo.release_seats(&[seat.id], false).await,
            Err(Error::SeatNotReserved)
        );
        repo.release_seats(&[seat.id], true).await.unwrap();
        assert_eq!(repo.get(seat.id).await.unwrap().status, SeatStatus::Available);

        repo.delete_for_event(event_id).await.unwrap();
    }
}
