use std::sync::Arc;

use crate::db::TicketStore;
use crate::models::{Booking, BookingRequest};
use crate::services::notifier::Notifier;
use crate::utils::error::AppError;

/// Capacity-checked booking writer.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn TicketStore>,
    notifier: Notifier,
}

impl BookingService {
    pub fn new(store: Arc<dyn TicketStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Creates an unpaid ticket, failing with `DuplicateBooking`,
    /// `EventNotFound` or `EventFull`. Sends nothing.
    pub async fn reserve(&self, request: BookingRequest) -> Result<Booking, AppError> {
        let ticket = request.into_new_ticket();
        let event_id = ticket.event_id;

        let booking = self.store.book_ticket(ticket).await.map_err(|e| {
            tracing::debug!(event_id, error = %e, "Booking refused");
            AppError::from(e)
        })?;

        tracing::info!(
            ticket_id = booking.ticket.id,
            event_id,
            "Ticket reserved"
        );
        Ok(booking)
    }

    /// Free booking: reserve, then confirm by email right away.
    pub async fn book_free(&self, request: BookingRequest) -> Result<Booking, AppError> {
        let booking = self.reserve(request).await?;
        self.notifier.dispatch_confirmation(&booking).await;
        Ok(booking)
    }
}
