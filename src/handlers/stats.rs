use axum::extract::State;
use axum::response::Response;

use crate::app_state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AdminUser;
use crate::utils::response::success;

pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let stats = state.store.stats().await?;
    Ok(success(stats, "Stats retrieved"))
}
