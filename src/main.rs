use std::sync::Arc;

use dotenvy::dotenv;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::clients::{MailError, PaymentError, SmtpMailer, StripeClient};
use ticketing_server::config::{Config, ConfigError};
use ticketing_server::db::{DbError, PgStore};
use ticketing_server::routes::create_routes;
use ticketing_server::AppState;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),

    #[error("mail transport: {0}")]
    Mail(#[from] MailError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketing_server=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Successfully connected to database");

    store.migrate().await?;
    tracing::info!("Migrations run successfully");

    let payments = StripeClient::new(&config.payments)?;
    let mailer = SmtpMailer::new(&config.mail)?;

    let addr = config.bind_addr;
    let state = AppState::new(config, Arc::new(store), Arc::new(payments), Arc::new(mailer));
    let app = create_routes(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
