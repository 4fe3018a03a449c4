use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::app_state::AppState;
use crate::models::BookingRequest;
use crate::utils::error::AppError;
use crate::utils::extract::{parse_id, AdminUser, ValidatedJson};
use crate::utils::response::{created, success};

/// Free booking: the ticket is created and confirmed by email at once.
pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<BookingRequest>,
) -> Result<Response, AppError> {
    let booking = state.bookings.book_free(request).await?;
    Ok(created(json!({ "id": booking.ticket.id }), "Booking created"))
}

pub async fn list_bookings(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let bookings = state.store.list_bookings().await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn delete_booking(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "Invalid ticket ID")?;
    let ticket = state.store.delete_ticket(id).await?;
    tracing::info!(ticket_id = id, admin = %admin.email, "Booking deleted");
    Ok(success(ticket, "Booking deleted"))
}
