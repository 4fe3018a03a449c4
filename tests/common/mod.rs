#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ticketing_server::clients::{MockPaymentProvider, RecordingMailer};
use ticketing_server::config::Config;
use ticketing_server::db::{InMemoryStore, TicketStore};
use ticketing_server::models::{Event, NewEvent};
use ticketing_server::routes::create_routes;
use ticketing_server::services::signature;
use ticketing_server::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const IDENTITY_HEADER: &str = "x-forwarded-email";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<MockPaymentProvider>,
}

pub fn config(extra: &[(&'static str, &'static str)]) -> Config {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused/tickets"),
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("SMTP_HOST", "smtp.example.com"),
        ("ADMIN_EMAILS", ADMIN_EMAIL),
        ("PUBLIC_BASE_URL", "https://tickets.example.com"),
    ]);
    vars.extend(extra.iter().copied());
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(config(&[]), MockPaymentProvider::new())
    }

    pub fn build(config: Config, payments: MockPaymentProvider) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let payments = Arc::new(payments);

        let state = AppState::new(config, store.clone(), payments.clone(), mailer.clone());
        Self {
            router: create_routes(state),
            store,
            mailer,
            payments,
        }
    }

    pub async fn event(&self, title: &str, capacity: Option<i32>) -> Event {
        self.store
            .create_event(NewEvent {
                title: title.to_string(),
                date: Utc::now() + Duration::days(30),
                capacity,
            })
            .await
            .expect("create event")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body, None)).await
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => json_request(method, uri, body, Some(ADMIN_EMAIL)),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .header(IDENTITY_HEADER, ADMIN_EMAIL)
                .body(Body::empty())
                .unwrap(),
        };
        self.send(request).await
    }

    pub async fn book(&self, name: &str, email: &str, event_id: i32) -> (StatusCode, Value) {
        self.post_json(
            "/api/bookings",
            serde_json::json!({ "name": name, "email": email, "eventId": event_id }),
        )
        .await
    }

    /// Delivers a signed `checkout.session.completed` for `ticket_id`.
    pub async fn deliver_payment(&self, ticket_id: i32) -> (StatusCode, Value) {
        let payload = completed_session(ticket_id);
        let header = signature::sign(WEBHOOK_SECRET, Utc::now().timestamp(), &payload);
        self.webhook(payload, Some(header)).await
    }

    pub async fn webhook(&self, payload: Vec<u8>, signature: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::post("/api/webhook").header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("stripe-signature", signature);
        }
        self.send(builder.body(Body::from(payload)).unwrap()).await
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, identity: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn completed_session(ticket_id: i32) -> Vec<u8> {
    serde_json::json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_test_{ticket_id}"),
                "payment_status": "paid",
                "metadata": { "ticket_id": ticket_id.to_string() }
            }
        }
    })
    .to_string()
    .into_bytes()
}
