use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::app_state::AppState;
use crate::utils::response::{error, success};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    if let Err(e) = state.store.ping().await {
        tracing::warn!(error = %e, "Health check: database unreachable");
        return error(
            "SERVICE_UNAVAILABLE",
            "Database unreachable",
            None,
            StatusCode::SERVICE_UNAVAILABLE,
        );
    }

    let payload = HealthPayload {
        status: "ok",
        service: "ticketing-api",
        database: "ok",
    };
    success(payload, "Health check successful")
}
