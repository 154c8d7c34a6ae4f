//! spendsync entry-point: loads settings, prepares the store, and serves the
//! sync API.

mod server;

use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};
use spendsync::config::AppSettings;
use spendsync::inbound::http::health::HealthState;
use spendsync::outbound::auth::StaticTokenAuthenticator;
use spendsync::outbound::persistence::{DbPool, PoolConfig, run_migrations};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let authenticator =
        StaticTokenAuthenticator::parse(settings.auth_tokens()).map_err(std::io::Error::other)?;
    if authenticator.is_empty() {
        warn!("no auth tokens configured; every request will be rejected");
    }

    let mut config = ServerConfig::new(bind_addr, Arc::new(authenticator));
    if let Some(database_url) = settings.database_url() {
        run_migrations(database_url)
            .await
            .map_err(std::io::Error::other)?;
        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
        )
        .await
        .map_err(std::io::Error::other)?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(%bind_addr, "spendsync listening");
    server.await
}
