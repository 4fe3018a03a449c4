use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;

use crate::app_state::AppState;
use crate::services::WebhookOutcome;
use crate::utils::error::AppError;
use crate::utils::response::empty_success;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Takes the body as raw bytes; the signature covers them exactly.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.webhooks.handle(signature, &body, Utc::now()).await?;

    let message = match outcome {
        WebhookOutcome::Confirmed { .. } => "Payment recorded",
        WebhookOutcome::AlreadyPaid { .. } => "Payment already recorded",
        WebhookOutcome::UnknownTicket { .. } | WebhookOutcome::MissingTicketReference => {
            "No matching ticket"
        }
        WebhookOutcome::PaymentPending => "Payment pending",
        WebhookOutcome::Ignored { .. } => "Received",
    };
    Ok(empty_success(message))
}
