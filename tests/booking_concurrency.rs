//! Parallel bookings, check-ins and payment redeliveries through the service
//! layer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use ticketing_server::clients::RecordingMailer;
use ticketing_server::db::{InMemoryStore, TicketStore};
use ticketing_server::models::{BookingRequest, NewEvent};
use ticketing_server::config::CheckInPolicy;
use ticketing_server::services::signature;
use ticketing_server::services::{
    BookingService, CheckInService, Notifier, PaymentWebhookService, WebhookOutcome,
};
use ticketing_server::utils::error::AppError;

fn service() -> (BookingService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Notifier::new(Arc::new(RecordingMailer::new()), "http://localhost:3000");
    (BookingService::new(store.clone(), notifier), store)
}

async fn capped_event(store: &InMemoryStore, capacity: i32) -> i32 {
    store
        .create_event(NewEvent {
            title: "Capped".to_string(),
            date: Utc::now() + Duration::days(7),
            capacity: Some(capacity),
        })
        .await
        .unwrap()
        .id
}

fn request(index: usize, event_id: i32) -> BookingRequest {
    BookingRequest {
        name: "Concurrent Guest".to_string(),
        email: format!("guest{index}@example.com"),
        event_id,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_holds_under_parallel_bookings() {
    let (bookings, store) = service();
    let capacity = 5;
    let event_id = capped_event(&store, capacity).await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let bookings = bookings.clone();
            tokio::spawn(async move { bookings.book_free(request(i, event_id)).await })
        })
        .collect();

    let mut confirmed = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(AppError::EventFull) => full += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(confirmed, capacity as usize);
    assert_eq!(full, 20 - capacity as usize);
    assert_eq!(store.tickets_for_event(event_id).await.len(), capacity as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_last_seat_goes_to_exactly_one() {
    let (bookings, store) = service();
    let event_id = capped_event(&store, 1).await;

    let first = tokio::spawn({
        let bookings = bookings.clone();
        async move { bookings.book_free(request(1, event_id)).await }
    });
    let second = tokio::spawn({
        let bookings = bookings.clone();
        async move { bookings.book_free(request(2, event_id)).await }
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::EventFull))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_requests_book_once() {
    let (bookings, store) = service();
    let event_id = capped_event(&store, 10).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bookings = bookings.clone();
            tokio::spawn(async move { bookings.book_free(request(0, event_id)).await })
        })
        .collect();

    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(AppError::DuplicateBooking) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(store.tickets_for_event(event_id).await.len(), 1);
}

async fn booked_ticket(bookings: &BookingService, store: &InMemoryStore) -> i32 {
    let event_id = capped_event(store, 10).await;
    bookings
        .reserve(request(0, event_id))
        .await
        .unwrap()
        .ticket
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_check_ins_admit_once() {
    let (bookings, store) = service();
    let ticket_id = booked_ticket(&bookings, &store).await;
    let check_ins = CheckInService::new(store.clone(), CheckInPolicy::AllowUnpaid);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let check_ins = check_ins.clone();
            tokio::spawn(async move { check_ins.check_in(ticket_id).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ticket) => {
                assert!(ticket.checked_in);
                admitted += 1;
            }
            Err(AppError::AlreadyCheckedIn) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(admitted, 1);
    assert!(store.ticket(ticket_id).await.unwrap().checked_in);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_redeliveries_confirm_once() {
    const SECRET: &str = "whsec_race";

    let (bookings, store) = service();
    let ticket_id = booked_ticket(&bookings, &store).await;
    let mailer = Arc::new(RecordingMailer::new());
    let notifier = Notifier::new(mailer.clone(), "http://localhost:3000");
    let webhooks = PaymentWebhookService::new(store.clone(), notifier, SECRET, 300);

    let payload = serde_json::json!({
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "payment_status": "paid",
                "metadata": { "ticket_id": ticket_id.to_string() }
            }
        }
    })
    .to_string()
    .into_bytes();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let webhooks = webhooks.clone();
            let payload = payload.clone();
            tokio::spawn(async move {
                let now = Utc::now();
                let header = signature::sign(SECRET, now.timestamp(), &payload);
                webhooks.handle(Some(&header), &payload, now).await
            })
        })
        .collect();

    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            WebhookOutcome::Confirmed { .. } => confirmed += 1,
            WebhookOutcome::AlreadyPaid { .. } => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(mailer.sent().len(), 1);
    assert!(store.ticket(ticket_id).await.unwrap().paid);
}
