//! Redis ticket repository.

use crate::client::{encode_err, store_err, RedisStore};
use crate::keys;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::AsyncCommands;
use turnstile_core::domain::{EventId, SeatId, Ticket, TicketId, TicketStatus, UserId};
use turnstile_core::repository::TicketRepository;
use turnstile_core::{Error, Result};

/// Reserved → Confirmed. The reservation deadline is read from the expiry
/// index (numeric compare; the JSON copy only mirrors it) and cleared on
/// success together with the status indices.
///
/// KEYS: ticket body, tickets:reserved, tickets:confirmed, expiry zset.
/// ARGV: ticket id, now (RFC 3339), now (unix seconds).
const CONFIRM_SCRIPT: &str = r#"
    local raw = redis.call('GET', KEYS[1])
    if raw == false then
        return 'ticket_not_found'
    end

    local ticket = cjson.decode(raw)
    if ticket.status ~= 'reserved' then
        return 'ticket_not_reserved'
    end

    local deadline = redis.call('ZSCORE', KEYS[4], ARGV[1])
    if deadline and tonumber(deadline) < tonumber(ARGV[3]) then
        return 'ticket_expired'
    end

    ticket.status = 'confirmed'
    ticket.expires_at = nil
    ticket.updated_at = ARGV[2]

    local encoded = cjson.encode(ticket)
    redis.call('SET', KEYS[1], encoded)
    redis.call('SREM', KEYS[2], ARGV[1])
    redis.call('SADD', KEYS[3], ARGV[1])
    redis.call('ZREM', KEYS[4], ARGV[1])
    return encoded
"#;

/// Any non-Cancelled status → Cancelled.
///
/// KEYS: ticket body, tickets:reserved, tickets:confirmed,
/// tickets:cancelled, expiry zset. ARGV: ticket id, now (RFC 3339).
const CANCEL_SCRIPT: &str = r#"
    local raw = redis.call('GET', KEYS[1])
    if raw == false then
        return 'ticket_not_found'
    end

    local ticket = cjson.decode(raw)
    if ticket.status == 'cancelled' then
        return 'already_cancelled'
    end

    ticket.status = 'cancelled'
    ticket.expires_at = nil
    ticket.updated_at = ARGV[2]

    local encoded = cjson.encode(ticket)
    redis.call('SET', KEYS[1], encoded)
    redis.call('SREM', KEYS[2], ARGV[1])
    redis.call('SREM', KEYS[3], ARGV[1])
    redis.call('SADD', KEYS[4], ARGV[1])
    redis.call('ZREM', KEYS[5], ARGV[1])
    return encoded
"#;

/// Ticket storage, secondary indices, and the ticket state machine.
#[derive(Debug, Clone)]
pub struct RedisTicketRepository {
    store: RedisStore,
}

impl RedisTicketRepository {
    /// Create a repository over a shared store handle.
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .get_json(&keys::ticket(id))
            .await?
            .ok_or(Error::NotFound { entity: "ticket" })
    }

    async fn load_members(&self, members: Vec<String>) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::with_capacity(members.len());
        for member in members {
            let Ok(id) = member.parse::<TicketId>() else {
                continue;
            };
            match self.load(id).await {
                Ok(ticket) => tickets.push(ticket),
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(tickets)
    }

    fn decode_script_result(outcome: &str) -> Result<Ticket> {
        match outcome {
            "ticket_not_found" => Err(Error::NotFound { entity: "ticket" }),
            "ticket_not_reserved" => Err(Error::TicketNotReserved),
            "ticket_expired" => Err(Error::TicketExpired),
            "already_cancelled" => Err(Error::AlreadyCancelled),
            json => serde_json::from_str(json).map_err(encode_err),
        }
    }
}

impl TicketRepository for RedisTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<()> {
        let data = serde_json::to_string(ticket).map_err(encode_err)?;
        let member = ticket.id.to_string();
        let mut conn = self.store.conn();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(keys::ticket(ticket.id), data)
            .ignore()
            .sadd(keys::user_tickets(ticket.user_id), &member)
            .ignore()
            .sadd(keys::event_tickets(ticket.event_id), &member)
            .ignore()
            .sadd(keys::tickets_by_status(ticket.status.as_str()), &member)
            .ignore();
        if let Some(seat_id) = ticket.seat_id {
            pipe.set(keys::seat_ticket(seat_id), &member).ignore();
        }
        if ticket.status == TicketStatus::Reserved {
            if let Some(expires_at) = ticket.expires_at {
                pipe.zadd(keys::TICKETS_RESERVED_EXPIRY, &member, expires_at.timestamp())
                    .ignore();
            }
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(store_err)?;

        tracing::info!(
            ticket_id = %ticket.id,
            event_id = %ticket.event_id,
            user_id = %ticket.user_id,
            status = ticket.status.as_str(),
            "created ticket"
        );
        Ok(())
    }

    async fn get(&self, id: TicketId) -> Result<Ticket> {
        self.load(id).await
    }

    async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .smembers(keys::user_tickets(user_id))
            .await
            .map_err(store_err)?;
        self.load_members(members).await
    }

    async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .smembers(keys::event_tickets(event_id))
            .await
            .map_err(store_err)?;
        self.load_members(members).await
    }

    async fn ticket_for_seat(&self, seat_id: SeatId) -> Result<Ticket> {
        let mut conn = self.store.conn();
        let member: Option<String> = conn
            .get(keys::seat_ticket(seat_id))
            .await
            .map_err(store_err)?;
        let id = member
            .and_then(|m| m.parse::<TicketId>().ok())
            .ok_or(Error::NotFound { entity: "ticket" })?;
        self.load(id).await
    }

    async fn confirm(&self, id: TicketId, now: DateTime<Utc>) -> Result<Ticket> {
        let mut conn = self.store.conn();
        let outcome: String = redis::Script::new(CONFIRM_SCRIPT)
            .key(keys::ticket(id))
            .key(keys::tickets_by_status("reserved"))
            .key(keys::tickets_by_status("confirmed"))
            .key(keys::TICKETS_RESERVED_EXPIRY)
            .arg(id.to_string())
            .arg(now.to_rfc3339_opts(SecondsFormat::Micros, true))
            .arg(now.timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        let ticket = Self::decode_script_result(&outcome)?;
        tracing::info!(ticket_id = %id, "confirmed ticket");
        Ok(ticket)
    }

    async fn cancel(&self, id: TicketId) -> Result<Ticket> {
        let now = Utc::now();
        let mut conn = self.store.conn();
        let outcome: String = redis::Script::new(CANCEL_SCRIPT)
            .key(keys::ticket(id))
            .key(keys::tickets_by_status("reserved"))
            .key(keys::tickets_by_status("confirmed"))
            .key(keys::tickets_by_status("cancelled"))
            .key(keys::TICKETS_RESERVED_EXPIRY)
            .arg(id.to_string())
            .arg(now.to_rfc3339_opts(SecondsFormat::Micros, true))
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        let ticket = Self::decode_script_result(&outcome)?;
        tracing::info!(ticket_id = %id, "cancelled ticket");
        Ok(ticket)
    }

    async fn expired_reservations(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let mut conn = self.store.conn();
        let members: Vec<String> = conn
            .zrangebyscore(keys::TICKETS_RESERVED_EXPIRY, "-inf", now.timestamp())
            .await
            .map_err(store_err)?;

        let tickets = self.load_members(members).await?;
        // The index can briefly lead the bodies; trust only what the
        // bodies say.
        Ok(tickets
            .into_iter()
            .filter(|t| t.is_reserved() && t.is_expired())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_ticket(expires_in: Duration) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(),
            event_id: EventId::new(),
            seat_id: None,
            user_id: UserId::new(),
            price: 5000,
            status: TicketStatus::Reserved,
            issued_at: now,
            expires_at: Some(now + expires_in),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn script_sentinels_map_to_errors() {
        assert_eq!(
            RedisTicketRepository::decode_script_result("ticket_not_found"),
            Err(Error::NotFound { entity: "ticket" })
        );
        assert_eq!(
            RedisTicketRepository::decode_script_result("ticket_expired"),
            Err(Error::TicketExpired)
        );
        assert_eq!(
            RedisTicketRepository::decode_script_result("already_cancelled"),
            Err(Error::AlreadyCancelled)
        );
    }

    // Requires a running Redis instance:
    //   docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn confirm_clears_deadline_and_indices() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisTicketRepository::new(store);
        let ticket = sample_ticket(Duration::minutes(15));
        repo.create(&ticket).await.unwrap();

        let confirmed = repo.confirm(ticket.id, Utc::now()).await.unwrap();
        assert_eq!(confirmed.status, TicketStatus::Confirmed);
        assert_eq!(confirmed.expires_at, None);

        // Second confirmation is a state-machine violation.
        assert_eq!(
            repo.confirm(ticket.id, Utc::now()).await,
            Err(Error::TicketNotReserved)
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn expired_reservation_cannot_confirm() {
        let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
        let repo = RedisTicketRepository::new(store);
        let ticket = sample_ticket(Duration::minutes(-1));
        repo.create(&ticket).await.unwrap();

        assert_eq!(
            repo.confirm(ticket.id, Utc::now()).await,
            Err(Error::TicketExpired)
        );

        let expired = repo.expired_reservations(Utc::now()).await.unwrap();
        assert!(expired.iter().any(|t| t.id == ticket.id));

        let cancelled = repo.cancel(ticket.id).await.unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(repo.cancel(ticket.id).await, Err(Error::AlreadyCancelled));
    }
}
