//! Persistence for events and tickets.
//!
//! Every invariant that spans concurrent requests (capacity, one ticket per
//! email and event, single paid/checked-in transitions) is enforced inside a
//! [`TicketStore`] call, never by the caller reading and then writing.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CheckInPolicy;
use crate::models::{Booking, Event, EventChanges, NewEvent, NewTicket, Stats, Ticket};

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("event not found")]
    EventNotFound,

    #[error("ticket not found")]
    TicketNotFound,

    #[error("email already holds a ticket for this event")]
    DuplicateBooking,

    #[error("event is fully booked")]
    EventFull,

    #[error("ticket already checked in")]
    AlreadyCheckedIn,

    #[error("ticket has not been paid")]
    TicketUnpaid,

    #[error("capacity {capacity} is below the {booked} tickets already booked")]
    CapacityBelowBookings { capacity: i32, booked: i64 },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Result of applying a payment confirmation to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    /// This call moved the ticket from unpaid to paid.
    Confirmed(Booking),
    /// The ticket was already paid; nothing changed.
    AlreadyPaid,
    /// No ticket with that id exists.
    UnknownTicket,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn ping(&self) -> Result<(), DbError>;

    /// Events ordered by date, earliest first.
    async fn list_events(&self) -> Result<Vec<Event>, DbError>;

    async fn get_event(&self, id: i32) -> Result<Option<Event>, DbError>;

    async fn create_event(&self, event: NewEvent) -> Result<Event, DbError>;

    /// Applies `changes`, refusing a capacity below the current ticket count.
    async fn update_event(&self, id: i32, changes: EventChanges) -> Result<Event, DbError>;

    /// Deletes the event's tickets and then the event in one transaction.
    /// Returns the number of tickets removed.
    async fn delete_event(&self, id: i32) -> Result<u64, DbError>;

    /// Inserts an unpaid ticket after the duplicate and capacity checks, all
    /// atomic with respect to other bookings for the same event.
    async fn book_ticket(&self, ticket: NewTicket) -> Result<Booking, DbError>;

    /// Deletes the ticket only while it is still unpaid. Returns whether a
    /// row was removed.
    async fn release_unpaid_ticket(&self, id: i32) -> Result<bool, DbError>;

    /// Single conditional unpaid to paid transition.
    async fn mark_paid(&self, id: i32) -> Result<PaymentTransition, DbError>;

    /// Single conditional not-checked-in to checked-in transition.
    async fn check_in(&self, id: i32, policy: CheckInPolicy) -> Result<Ticket, DbError>;

    async fn get_booking(&self, id: i32) -> Result<Option<Booking>, DbError>;

    /// Bookings with their events, newest first.
    async fn list_bookings(&self) -> Result<Vec<Booking>, DbError>;

    async fn delete_ticket(&self, id: i32) -> Result<Ticket, DbError>;

    async fn stats(&self) -> Result<Stats, DbError>;
}
