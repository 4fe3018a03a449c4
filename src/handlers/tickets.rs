use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::Booking;
use crate::utils::error::AppError;
use crate::utils::extract::parse_id;
use crate::utils::response::success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketView {
    #[serde(flatten)]
    booking: Booking,
    qr_url: String,
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "Invalid ticket ID")?;
    let booking = state
        .store
        .get_booking(id)
        .await?
        .ok_or(AppError::TicketNotFound)?;

    let view = TicketView {
        qr_url: state.notifier.qr_url(id),
        booking,
    };
    Ok(success(view, "Ticket retrieved"))
}
