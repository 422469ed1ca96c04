//! Rentledger service entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rentledger::adapters::events::InMemoryEventBus;
use rentledger::adapters::gateway::{GatewayConfig, HttpPaymentGateway};
use rentledger::adapters::http::payments::{payments_router, PaymentsAppState};
use rentledger::adapters::postgres::{
    PostgresPaymentMethodRepository, PostgresPaymentRepository, PostgresSubscriptionRepository,
    PostgresWebhookEventRepository,
};
use rentledger::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .json()
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let state = PaymentsAppState::new(
        Arc::new(PostgresPaymentRepository::new(pool.clone())),
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresPaymentMethodRepository::new(pool.clone())),
        Arc::new(PostgresWebhookEventRepository::new(pool)),
        Arc::new(HttpPaymentGateway::new(GatewayConfig::new(
            config.gateway.api_key.clone(),
            config.gateway.api_base_url.clone(),
        ))),
        Arc::new(InMemoryEventBus::new()),
        &config.gateway.webhook_secret,
    );

    let app = payments_router()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, test_mode = config.gateway.is_test_mode(), "Starting rentledger");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
