use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    bookings, check_in, checkout, events, health_check, qr, stats, tickets, webhook,
};

pub fn create_routes(state: AppState) -> Router {
    let production = state.config.production;
    let cors = create_cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(production))
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", delete(bookings::delete_booking))
        .route("/api/checkout", post(checkout::start_checkout))
        .route("/api/webhook", post(webhook::payment_webhook))
        .route("/api/tickets/:id", get(tickets::get_ticket))
        .route("/api/qr", get(qr::qr_code))
        .route("/api/stats", get(stats::stats))
        .route("/api/check-in", post(check_in::check_in))
}
