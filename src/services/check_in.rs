use std::sync::Arc;

use crate::config::CheckInPolicy;
use crate::db::TicketStore;
use crate::models::Ticket;
use crate::utils::error::AppError;

/// One-way not-checked-in to checked-in transition.
#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn TicketStore>,
    policy: CheckInPolicy,
}

impl CheckInService {
    pub fn new(store: Arc<dyn TicketStore>, policy: CheckInPolicy) -> Self {
        Self { store, policy }
    }

    /// Fails with `TicketNotFound`, `AlreadyCheckedIn`, or `TicketUnpaid` when
    /// the policy requires payment.
    pub async fn check_in(&self, ticket_id: i32) -> Result<Ticket, AppError> {
        let ticket = self.store.check_in(ticket_id, self.policy).await?;
        tracing::info!(ticket_id, event_id = ticket.event_id, "Ticket checked in");
        Ok(ticket)
    }
}
