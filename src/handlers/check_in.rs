use axum::extract::State;
use axum::response::Response;

use crate::app_state::AppState;
use crate::models::CheckInRequest;
use crate::utils::error::AppError;
use crate::utils::extract::{AdminUser, ValidatedJson};
use crate::utils::response::success;

pub async fn check_in(
    _admin: AdminUser,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CheckInRequest>,
) -> Result<Response, AppError> {
    let ticket = state.check_ins.check_in(request.ticket_id).await?;
    Ok(success(ticket, "Ticket checked in"))
}
