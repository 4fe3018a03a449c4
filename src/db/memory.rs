//! In-memory [`TicketStore`] for tests.
//!
//! One mutex guards all state, so every call is atomic the way a serializable
//! transaction would be.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{DbError, PaymentTransition, TicketStore};
use crate::config::CheckInPolicy;
use crate::models::{Booking, Event, EventChanges, NewEvent, NewTicket, Stats, Ticket};

#[derive(Default)]
struct State {
    events: BTreeMap<i32, Event>,
    tickets: BTreeMap<i32, Ticket>,
    next_event_id: i32,
    next_ticket_id: i32,
}

impl State {
    fn booking(&self, ticket: &Ticket) -> Option<Booking> {
        self.events.get(&ticket.event_id).map(|event| Booking {
            ticket: ticket.clone(),
            event: event.clone(),
        })
    }

    fn tickets_for(&self, event_id: i32) -> usize {
        self.tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .count()
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`DbError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn ticket(&self, id: i32) -> Option<Ticket> {
        self.state.lock().await.tickets.get(&id).cloned()
    }

    pub async fn tickets_for_event(&self, event_id: i32) -> Vec<Ticket> {
        self.state
            .lock()
            .await
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect()
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        self.check_available()
    }

    async fn list_events(&self) -> Result<Vec<Event>, DbError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state.events.values().cloned().collect();
        events.sort_by_key(|e| (e.date, e.id));
        Ok(events)
    }

    async fn get_event(&self, id: i32) -> Result<Option<Event>, DbError> {
        self.check_available()?;
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        state.next_event_id += 1;
        let created = Event {
            id: state.next_event_id,
            title: event.title,
            date: event.date,
            capacity: event.capacity,
        };
        state.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_event(&self, id: i32, changes: EventChanges) -> Result<Event, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state.events.contains_key(&id) {
            return Err(DbError::EventNotFound);
        }

        if let Some(capacity) = changes.capacity {
            let booked = state.tickets_for(id) as i64;
            if booked > i64::from(capacity) {
                return Err(DbError::CapacityBelowBookings { capacity, booked });
            }
        }

        let event = state.events.get_mut(&id).ok_or(DbError::EventNotFound)?;
        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(capacity) = changes.capacity {
            event.capacity = Some(capacity);
        }
        Ok(event.clone())
    }

    async fn delete_event(&self, id: i32) -> Result<u64, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.events.remove(&id).is_none() {
            return Err(DbError::EventNotFound);
        }
        let before = state.tickets.len();
        state.tickets.retain(|_, t| t.event_id != id);
        Ok((before - state.tickets.len()) as u64)
    }

    async fn book_ticket(&self, ticket: NewTicket) -> Result<Booking, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let event = state
            .events
            .get(&ticket.event_id)
            .cloned()
            .ok_or(DbError::EventNotFound)?;

        let duplicate = state
            .tickets
            .values()
            .any(|t| t.event_id == ticket.event_id && t.email == ticket.email);
        if duplicate {
            return Err(DbError::DuplicateBooking);
        }

        if let Some(capacity) = event.capacity {
            if state.tickets_for(event.id) as i64 >= i64::from(capacity) {
                return Err(DbError::EventFull);
            }
        }

        state.next_ticket_id += 1;
        let created = Ticket {
            id: state.next_ticket_id,
            name: ticket.name,
            email: ticket.email,
            event_id: ticket.event_id,
            created_at: Utc::now(),
            paid: false,
            checked_in: false,
        };
        state.tickets.insert(created.id, created.clone());

        Ok(Booking {
            ticket: created,
            event,
        })
    }

    async fn release_unpaid_ticket(&self, id: i32) -> Result<bool, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        match state.tickets.get(&id) {
            Some(ticket) if !ticket.paid => {
                state.tickets.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_paid(&self, id: i32) -> Result<PaymentTransition, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let Some(ticket) = state.tickets.get_mut(&id) else {
            return Ok(PaymentTransition::UnknownTicket);
        };
        if ticket.paid {
            return Ok(PaymentTransition::AlreadyPaid);
        }
        ticket.paid = true;
        let ticket = ticket.clone();

        state
            .booking(&ticket)
            .map(PaymentTransition::Confirmed)
            .ok_or(DbError::EventNotFound)
    }

    async fn check_in(&self, id: i32, policy: CheckInPolicy) -> Result<Ticket, DbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let ticket = state.tickets.get_mut(&id).ok_or(DbError::TicketNotFound)?;
        if ticket.checked_in {
            return Err(DbError::AlreadyCheckedIn);
        }
        if policy.requires_payment() && !ticket.paid {
            return Err(DbError::TicketUnpaid);
        }
        ticket.checked_in = true;
        Ok(ticket.clone())
    }

    async fn get_booking(&self, id: i32) -> Result<Option<Booking>, DbError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.tickets.get(&id).and_then(|t| state.booking(t)))
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, DbError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .tickets
            .values()
            .filter_map(|t| state.booking(t))
            .collect();
        bookings.sort_by(|a, b| {
            (b.ticket.created_at, b.ticket.id).cmp(&(a.ticket.created_at, a.ticket.id))
        });
        Ok(bookings)
    }

    async fn delete_ticket(&self, id: i32) -> Result<Ticket, DbError> {
        self.check_available()?;
        self.state
            .lock()
            .await
            .tickets
            .remove(&id)
            .ok_or(DbError::TicketNotFound)
    }

    async fn stats(&self) -> Result<Stats, DbError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let total_bookings = state.tickets.len() as i64;
        let checked_in = state.tickets.values().filter(|t| t.checked_in).count() as i64;
        let paid = state.tickets.values().filter(|t| t.paid).count() as i64;

        Ok(Stats {
            total_bookings,
            checked_in,
            not_checked_in: total_bookings - checked_in,
            paid,
            total_events: state.events.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn store_with_event(capacity: Option<i32>) -> (InMemoryStore, Event) {
        let store = InMemoryStore::new();
        let event = store
            .create_event(NewEvent {
                title: "Meetup".to_string(),
                date: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
                capacity,
            })
            .await
            .unwrap();
        (store, event)
    }

    fn new_ticket(email: &str, event_id: i32) -> NewTicket {
        NewTicket {
            name: "Ada".to_string(),
            email: email.to_string(),
            event_id,
        }
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let (store, event) = store_with_event(Some(1)).await;

        store.book_ticket(new_ticket("a@x.com", event.id)).await.unwrap();
        let err = store
            .book_ticket(new_ticket("b@x.com", event.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::EventFull));
    }

    #[tokio::test]
    async fn test_capacity_cannot_drop_below_bookings() {
        let (store, event) = store_with_event(Some(5)).await;
        store.book_ticket(new_ticket("a@x.com", event.id)).await.unwrap();
        store.book_ticket(new_ticket("b@x.com", event.id)).await.unwrap();

        let err = store
            .update_event(
                event.id,
                EventChanges {
                    capacity: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::CapacityBelowBookings {
                capacity: 1,
                booked: 2
            }
        ));

        let updated = store
            .update_event(
                event.id,
                EventChanges {
                    capacity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.capacity, Some(2));
        assert_eq!(updated.title, "Meetup");
    }

    #[tokio::test]
    async fn test_release_keeps_paid_tickets() {
        let (store, event) = store_with_event(None).await;
        let booking = store.book_ticket(new_ticket("a@x.com", event.id)).await.unwrap();
        store.mark_paid(booking.ticket.id).await.unwrap();

        assert!(!store.release_unpaid_ticket(booking.ticket.id).await.unwrap());
        assert!(store.ticket(booking.ticket.id).await.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_calls() {
        let (store, _) = store_with_event(None).await;
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(DbError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
