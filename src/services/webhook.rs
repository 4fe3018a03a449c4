use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::{PaymentTransition, TicketStore};
use crate::services::notifier::Notifier;
use crate::services::signature;
use crate::utils::error::AppError;

const SESSION_COMPLETED: &str = "checkout.session.completed";
const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

#[derive(Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    payment_status: Option<String>,
}

/// What a verified notification led to. Every variant is acknowledged to the
/// provider with a success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed { ticket_id: i32, email_sent: bool },
    AlreadyPaid { ticket_id: i32 },
    UnknownTicket { ticket_id: i32 },
    MissingTicketReference,
    PaymentPending,
    Ignored { event_type: String },
}

/// Payment confirmation receiver.
#[derive(Clone)]
pub struct PaymentWebhookService {
    store: Arc<dyn TicketStore>,
    notifier: Notifier,
    secret: String,
    tolerance_secs: i64,
}

impl PaymentWebhookService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        notifier: Notifier,
        secret: impl Into<String>,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verifies `payload` against `signature_header` before reading it.
    ///
    /// A store failure is returned as an error so the provider redelivers;
    /// an email failure is not.
    pub async fn handle(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, AppError> {
        signature::verify(
            signature_header,
            payload,
            &self.secret,
            self.tolerance_secs,
            now,
        )
        .map_err(|e| AppError::SignatureVerificationError(e.to_string()))?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::ValidationError(format!("Unreadable webhook payload: {e}")))?;

        if event.kind != SESSION_COMPLETED && event.kind != ASYNC_PAYMENT_SUCCEEDED {
            tracing::debug!(event_type = %event.kind, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.kind,
            });
        }

        let session: CheckoutSessionObject = serde_json::from_value(event.data.object)
            .map_err(|e| AppError::ValidationError(format!("Unreadable checkout session: {e}")))?;

        // Delayed payment methods complete the session before the money
        // arrives; the async_payment_succeeded event follows.
        if event.kind == SESSION_COMPLETED && session.payment_status.as_deref() == Some("unpaid") {
            return Ok(WebhookOutcome::PaymentPending);
        }

        let metadata = session.metadata.unwrap_or_default();
        let Some(ticket_id) = metadata
            .get("ticket_id")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
        else {
            tracing::warn!("Completed checkout carries no ticket reference");
            return Ok(WebhookOutcome::MissingTicketReference);
        };

        match self.store.mark_paid(ticket_id).await? {
            PaymentTransition::Confirmed(booking) => {
                tracing::info!(ticket_id, "Ticket marked as paid");
                let email_sent = self.notifier.dispatch_confirmation(&booking).await;
                Ok(WebhookOutcome::Confirmed {
                    ticket_id,
                    email_sent,
                })
            }
            PaymentTransition::AlreadyPaid => {
                tracing::info!(ticket_id, "Duplicate payment notification");
                Ok(WebhookOutcome::AlreadyPaid { ticket_id })
            }
            PaymentTransition::UnknownTicket => {
                tracing::warn!(ticket_id, "Payment notification for unknown ticket");
                Ok(WebhookOutcome::UnknownTicket { ticket_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RecordingMailer;
    use crate::db::InMemoryStore;
    use crate::services::signature::sign;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn service() -> (PaymentWebhookService, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone(), "http://localhost:3000");
        let service =
            PaymentWebhookService::new(Arc::new(InMemoryStore::new()), notifier, SECRET, 300);
        (service, mailer)
    }

    async fn deliver(service: &PaymentWebhookService, payload: serde_json::Value) -> WebhookOutcome {
        let body = payload.to_string().into_bytes();
        let now = Utc::now();
        let header = sign(SECRET, now.timestamp(), &body);
        service.handle(Some(&header), &body, now).await.unwrap()
    }

    #[tokio::test]
    async fn test_null_metadata_is_acknowledged() {
        let (service, mailer) = service();
        let payload = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "payment_status": "paid", "metadata": null } }
        });

        assert_eq!(
            deliver(&service, payload).await,
            WebhookOutcome::MissingTicketReference
        );
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_absent_metadata_is_acknowledged() {
        let (service, _) = service();
        let payload = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "payment_status": "paid" } }
        });

        assert_eq!(
            deliver(&service, payload).await,
            WebhookOutcome::MissingTicketReference
        );
    }

    #[tokio::test]
    async fn test_unpaid_session_is_pending() {
        let (service, _) = service();
        let payload = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "payment_status": "unpaid", "metadata": { "ticket_id": "1" } } }
        });

        assert_eq!(deliver(&service, payload).await, WebhookOutcome::PaymentPending);
    }
}
