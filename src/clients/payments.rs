use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::PaymentConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("request to payment provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("payment provider returned a session without a checkout url")]
    MissingUrl,

    #[error("ticket price {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),

    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub ticket_id: i32,
    pub event_id: i32,
    pub email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Opens a hosted checkout whose metadata names the ticket, returning the
    /// URL the payer is sent to.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

/// Stripe Checkout over its form-encoded REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
    product_name: String,
    unit_amount: i64,
}

impl StripeClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let unit_amount = (config.ticket_price * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .filter(|amount| *amount > 0)
            .ok_or(PaymentError::InvalidAmount(config.ticket_price))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
            product_name: config.product_name.clone(),
            unit_amount,
        })
    }

    fn form_fields(&self, request: &CheckoutSessionRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", self.unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                self.product_name.clone(),
            ),
            ("customer_email", request.email.clone()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[ticket_id]", request.ticket_id.to_string()),
            ("metadata[event_id]", request.event_id.to_string()),
            ("metadata[email]", request.email.clone()),
        ]
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&self.form_fields(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session.url.ok_or(PaymentError::MissingUrl)?;

        tracing::info!(
            ticket_id = request.ticket_id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

/// Provider double that records requests and can be told to fail.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockPaymentProvider {
    fail: bool,
    requests: std::sync::Mutex<Vec<CheckoutSessionRequest>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.fail {
            return Err(PaymentError::Unavailable("mock provider is down".to_string()));
        }

        let id = format!("cs_test_{}", request.ticket_id);
        Ok(CheckoutSession {
            url: format!("https://checkout.test/pay/{id}"),
            id,
        })
    }
}
