use axum::extract::State;
use axum::response::Response;

use crate::app_state::AppState;
use crate::models::BookingRequest;
use crate::utils::error::AppError;
use crate::utils::extract::ValidatedJson;
use crate::utils::response::success;

pub async fn start_checkout(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<BookingRequest>,
) -> Result<Response, AppError> {
    let started = state.checkout.start(request).await?;
    Ok(success(started, "Checkout session created"))
}
