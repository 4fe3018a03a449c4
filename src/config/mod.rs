//! Process configuration, read once from the environment at start-up.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Whether check-in needs a paid ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckInPolicy {
    #[default]
    AllowUnpaid,
    RequirePaid,
}

impl CheckInPolicy {
    pub fn requires_payment(self) -> bool {
        matches!(self, CheckInPolicy::RequirePaid)
    }
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Lowercased allow-list.
    pub emails: Vec<String>,
    /// Header carrying the email the authenticating proxy established.
    pub identity_header: String,
}

impl AdminConfig {
    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.emails.iter().any(|allowed| *allowed == email)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub ticket_price: Decimal,
    pub currency: String,
    pub product_name: String,
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub production: bool,
    pub public_base_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub admin: AdminConfig,
    pub payments: PaymentConfig,
    pub mail: MailConfig,
    pub check_in_policy: CheckInPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, validating every value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let ticket_price: Decimal = vars.parsed("TICKET_PRICE", Decimal::new(1000, 2))?;
        if ticket_price <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "TICKET_PRICE",
                value: ticket_price.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let payments = PaymentConfig {
            api_base: vars
                .or("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
            secret_key: vars.required("STRIPE_SECRET_KEY")?,
            webhook_secret: vars.required("STRIPE_WEBHOOK_SECRET")?,
            ticket_price,
            currency: vars.or("TICKET_CURRENCY", "usd").to_lowercase(),
            product_name: vars.or("TICKET_PRODUCT_NAME", "Event Ticket"),
            webhook_tolerance_secs: vars.parsed("WEBHOOK_TOLERANCE_SECS", 300)?,
        };

        let mail = MailConfig {
            smtp_host: vars.required("SMTP_HOST")?,
            smtp_port: vars.parsed("SMTP_PORT", 587)?,
            smtp_username: vars.or("SMTP_USERNAME", ""),
            smtp_password: vars.or("SMTP_PASSWORD", ""),
            from: vars.or("MAIL_FROM", "Ticket App <onboarding@example.com>"),
        };

        let admin = AdminConfig {
            emails: split_list(&vars.or("ADMIN_EMAILS", ""))
                .into_iter()
                .map(|email| email.to_lowercase())
                .collect(),
            identity_header: vars
                .or("ADMIN_IDENTITY_HEADER", "x-forwarded-email")
                .to_lowercase(),
        };

        let check_in_policy = if vars.parsed("CHECK_IN_REQUIRES_PAYMENT", false)? {
            CheckInPolicy::RequirePaid
        } else {
            CheckInPolicy::AllowUnpaid
        };

        Ok(Self {
            database_url: vars.required("DATABASE_URL")?,
            database_max_connections: vars.parsed("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: vars.parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001)))?,
            production: vars.or("RUST_ENV", "development").to_lowercase() == "production",
            public_base_url: vars
                .or("PUBLIC_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origins: split_list(&vars.or("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            admin,
            payments,
            mail,
            check_in_policy,
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        let parsed = value.trim().parse::<T>();
        parsed.map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
