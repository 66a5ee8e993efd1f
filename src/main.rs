//! Mindpath server binary.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use mindpath::adapters::auth::JwtSessionValidator;
use mindpath::adapters::http::progress::ProgressAppState;
use mindpath::adapters::http::server::app;
use mindpath::adapters::postgres::{PostgresProgressStore, PostgresSubscriptionReader};
use mindpath::adapters::rate_limiter::InMemoryRateLimiter;
use mindpath::config::AppConfig;
use mindpath::ports::{RateLimiter, SessionValidator, SubscriptionReader};

const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    let progress_store = Arc::new(PostgresProgressStore::new(pool.clone()));
    let subscription_reader: Arc<dyn SubscriptionReader> =
        Arc::new(PostgresSubscriptionReader::new(pool));
    let validator: Arc<dyn SessionValidator> =
        Arc::new(JwtSessionValidator::new(&config.auth.jwt_secret));

    let limiter = Arc::new(InMemoryRateLimiter::new(
        config.rate_limit.to_limiter_config(),
    ));
    spawn_limiter_sweep(limiter.clone());
    let limiter: Arc<dyn RateLimiter> = limiter;

    let state = ProgressAppState {
        progress_store,
        subscription_reader,
        rate_limiter: limiter.clone(),
        upgrade_url: config.billing.upgrade_url.clone(),
    };

    let router = app(state, validator, limiter, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn spawn_limiter_sweep(limiter: Arc<InMemoryRateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.sweep_expired().await;
        }
    });
}
