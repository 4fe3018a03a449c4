use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::{DbError, PaymentTransition, TicketStore};
use crate::config::CheckInPolicy;
use crate::models::{Booking, Event, EventChanges, NewEvent, NewTicket, Stats, Ticket};

const TICKET_COLUMNS: &str = "id, name, email, event_id, created_at, paid, checked_in";

const BOOKING_SELECT: &str = "SELECT t.id, t.name, t.email, t.event_id, t.created_at, t.paid, \
     t.checked_in, e.title AS event_title, e.date AS event_date, e.capacity AS event_capacity \
     FROM tickets t JOIN events e ON e.id = t.event_id";

#[derive(FromRow)]
struct BookingRow {
    id: i32,
    name: String,
    email: String,
    event_id: i32,
    created_at: DateTime<Utc>,
    paid: bool,
    checked_in: bool,
    event_title: String,
    event_date: DateTime<Utc>,
    event_capacity: Option<i32>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            ticket: Ticket {
                id: row.id,
                name: row.name,
                email: row.email,
                event_id: row.event_id,
                created_at: row.created_at,
                paid: row.paid,
                checked_in: row.checked_in,
            },
            event: Event {
                id: row.event_id,
                title: row.event_title,
                date: row.event_date,
                capacity: row.event_capacity,
            },
        }
    }
}

fn map_insert_error(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DbError::DuplicateBooking;
        }
    }
    DbError::Sqlx(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Sqlx(e.into()))
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, DbError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, title, date, capacity FROM events ORDER BY date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, id: i32) -> Result<Option<Event>, DbError> {
        let event =
            sqlx::query_as::<_, Event>("SELECT id, title, date, capacity FROM events WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(event)
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, DbError> {
        let created = sqlx::query_as::<_, Event>(
            "INSERT INTO events (title, date, capacity) VALUES ($1, $2, $3) \
             RETURNING id, title, date, capacity",
        )
        .bind(&event.title)
        .bind(event.date)
        .bind(event.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_event(&self, id: i32, changes: EventChanges) -> Result<Event, DbError> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so no booking lands between the count and the update.
        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::EventNotFound);
        }

        if let Some(capacity) = changes.capacity {
            let (booked,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            if booked > i64::from(capacity) {
                return Err(DbError::CapacityBelowBookings { capacity, booked });
            }
        }

        let updated = sqlx::query_as::<_, Event>(
            "UPDATE events SET title = COALESCE($2, title), date = COALESCE($3, date), \
             capacity = COALESCE($4, capacity) WHERE id = $1 \
             RETURNING id, title, date, capacity",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.date)
        .bind(changes.capacity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_event(&self, id: i32) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM tickets WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            // Dropping the transaction rolls back the ticket deletion.
            return Err(DbError::EventNotFound);
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn book_ticket(&self, ticket: NewTicket) -> Result<Booking, DbError> {
        let mut tx = self.pool.begin().await?;

        // The event row lock serializes bookings for this event only.
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, title, date, capacity FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(ticket.event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::EventNotFound)?;

        let duplicate: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM tickets WHERE email = $1 AND event_id = $2")
                .bind(&ticket.email)
                .bind(ticket.event_id)
                .fetch_optional(&mut *tx)
                .await?;
        if duplicate.is_some() {
            return Err(DbError::DuplicateBooking);
        }

        if let Some(capacity) = event.capacity {
            let (booked,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
                    .bind(ticket.event_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if booked >= i64::from(capacity) {
                return Err(DbError::EventFull);
            }
        }

        let sql = format!(
            "INSERT INTO tickets (name, email, event_id, paid) VALUES ($1, $2, $3, false) \
             RETURNING {TICKET_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Ticket>(&sql)
            .bind(&ticket.name)
            .bind(&ticket.email)
            .bind(ticket.event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_insert_error)?;

        tx.commit().await?;
        Ok(Booking {
            ticket: created,
            event,
        })
    }

    async fn release_unpaid_ticket(&self, id: i32) -> Result<bool, DbError> {
        let removed = sqlx::query("DELETE FROM tickets WHERE id = $1 AND paid = false")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    async fn mark_paid(&self, id: i32) -> Result<PaymentTransition, DbError> {
        let sql = format!(
            "WITH t AS (UPDATE tickets SET paid = true WHERE id = $1 AND paid = false \
             RETURNING {TICKET_COLUMNS}) \
             SELECT t.id, t.name, t.email, t.event_id, t.created_at, t.paid, t.checked_in, \
             e.title AS event_title, e.date AS event_date, e.capacity AS event_capacity \
             FROM t JOIN events e ON e.id = t.event_id"
        );
        let confirmed = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = confirmed {
            return Ok(PaymentTransition::Confirmed(row.into()));
        }

        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tickets WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            PaymentTransition::AlreadyPaid
        } else {
            PaymentTransition::UnknownTicket
        })
    }

    async fn check_in(&self, id: i32, policy: CheckInPolicy) -> Result<Ticket, DbError> {
        let sql = format!(
            "UPDATE tickets SET checked_in = true \
             WHERE id = $1 AND checked_in = false AND (paid OR NOT $2) \
             RETURNING {TICKET_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(policy.requires_payment())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(ticket) = updated {
            return Ok(ticket);
        }

        // Nothing matched; find out which precondition failed.
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let current = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Err(match current {
            None => DbError::TicketNotFound,
            Some(ticket) if ticket.checked_in => DbError::AlreadyCheckedIn,
            Some(_) => DbError::TicketUnpaid,
        })
    }

    async fn get_booking(&self, id: i32) -> Result<Option<Booking>, DbError> {
        let sql = format!("{BOOKING_SELECT} WHERE t.id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Booking::from))
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, DbError> {
        let sql = format!("{BOOKING_SELECT} ORDER BY t.created_at DESC, t.id DESC");
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn delete_ticket(&self, id: i32) -> Result<Ticket, DbError> {
        let sql = format!("DELETE FROM tickets WHERE id = $1 RETURNING {TICKET_COLUMNS}");
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::TicketNotFound)
    }

    async fn stats(&self) -> Result<Stats, DbError> {
        let stats = sqlx::query_as::<_, Stats>(
            "SELECT COUNT(*) AS total_bookings, \
             COUNT(*) FILTER (WHERE checked_in) AS checked_in, \
             COUNT(*) FILTER (WHERE NOT checked_in) AS not_checked_in, \
             COUNT(*) FILTER (WHERE paid) AS paid, \
             (SELECT COUNT(*) FROM events) AS total_events \
             FROM tickets",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
