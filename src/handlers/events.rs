use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::app_state::AppState;
use crate::models::{CreateEventRequest, UpdateEventRequest};
use crate::utils::error::AppError;
use crate::utils::extract::{parse_id, AdminUser, ValidatedJson};
use crate::utils::response::{created, success};

const INVALID_EVENT_ID: &str = "Invalid event ID";

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_events().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, INVALID_EVENT_ID)?;
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or(AppError::EventNotFound)?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    admin: AdminUser,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateEventRequest>,
) -> Result<Response, AppError> {
    let new_event = request
        .into_new_event()
        .ok_or_else(|| AppError::ValidationError("Invalid date format".to_string()))?;

    let event = state.store.create_event(new_event).await?;
    tracing::info!(event_id = event.id, admin = %admin.email, "Event created");
    Ok(created(event, "Event created"))
}

pub async fn update_event(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, INVALID_EVENT_ID)?;
    let changes = request
        .into_changes()
        .ok_or_else(|| AppError::ValidationError("Invalid date format".to_string()))?;

    let event = state.store.update_event(id, changes).await?;
    tracing::info!(event_id = id, admin = %admin.email, "Event updated");
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, INVALID_EVENT_ID)?;
    let removed = state.store.delete_event(id).await?;
    tracing::info!(
        event_id = id,
        tickets_removed = removed,
        admin = %admin.email,
        "Event deleted"
    );
    Ok(success(
        json!({ "id": id, "ticketsRemoved": removed }),
        "Event deleted",
    ))
}
