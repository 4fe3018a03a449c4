use std::sync::Arc;

use serde::Serialize;

use crate::clients::{CheckoutSessionRequest, PaymentProvider};
use crate::db::TicketStore;
use crate::models::BookingRequest;
use crate::services::booking::BookingService;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
    pub ticket_id: i32,
    pub url: String,
}

/// Payment session initiator.
///
/// Reserves the ticket first so capacity is held while the payer is at the
/// provider. If the provider cannot open a session the reservation is
/// released again before the error is returned.
#[derive(Clone)]
pub struct CheckoutService {
    bookings: BookingService,
    store: Arc<dyn TicketStore>,
    payments: Arc<dyn PaymentProvider>,
    public_base_url: String,
}

impl CheckoutService {
    pub fn new(
        bookings: BookingService,
        store: Arc<dyn TicketStore>,
        payments: Arc<dyn PaymentProvider>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            store,
            payments,
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn start(&self, request: BookingRequest) -> Result<CheckoutStarted, AppError> {
        let booking = self.bookings.reserve(request).await?;
        let ticket_id = booking.ticket.id;
        let event_id = booking.event.id;

        let session_request = CheckoutSessionRequest {
            ticket_id,
            event_id,
            email: booking.ticket.email.clone(),
            success_url: format!("{}/tickets/{ticket_id}?success=1", self.public_base_url),
            cancel_url: format!("{}/book/{event_id}?canceled=1", self.public_base_url),
        };

        match self.payments.create_checkout_session(&session_request).await {
            Ok(session) => Ok(CheckoutStarted {
                ticket_id,
                url: session.url,
            }),
            Err(e) => {
                self.release(ticket_id).await;
                Err(AppError::PaymentProviderError(e.to_string()))
            }
        }
    }

    async fn release(&self, ticket_id: i32) {
        match self.store.release_unpaid_ticket(ticket_id).await {
            Ok(true) => tracing::info!(ticket_id, "Released reservation after failed checkout"),
            Ok(false) => tracing::warn!(ticket_id, "Reservation already gone or paid"),
            Err(e) => tracing::error!(
                ticket_id,
                error = %e,
                "Could not release reservation after failed checkout"
            ),
        }
    }
}
