//! Dispatch entry-point: loads settings, wires adapters and runs the server
//! alongside the broker consumers.

mod server;

use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dispatch::inbound::http::health::HealthState;
use dispatch::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use dispatch::outbound::routing::OsrmRouteProvider;
use dispatch::settings::DispatchSettings;
use server::{ServerConfig, create_server};

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

    let settings =
        DispatchSettings::load().map_err(|err| std::io::Error::other(err.to_string()))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let route_url = settings
        .route_provider_url()
        .map_err(std::io::Error::other)?;
    let routes = OsrmRouteProvider::new(route_url, settings.route_provider_timeout())
        .map_err(std::io::Error::other)?;

    let mut config = ServerConfig::new(bind_addr, Arc::new(routes))
        .with_pricing(settings.pricing())
        .with_retry_policy(settings.retry_policy());
    if let Some(database_url) = settings.database_url() {
        config = config.with_db_pool(connect_database(database_url).await?);
    }

    let health_state = web::Data::new(HealthState::new());
    let (server, background) = create_server(health_state.clone(), config).await?;
    info!(%bind_addr, "dispatch listening");

    let result = server.await;
    health_state.mark_unhealthy();
    background.shutdown().await;
    result
}

async fn connect_database(database_url: &str) -> std::io::Result<DbPool> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || run_pending_migrations(&url))
        .await
        .map_err(std::io::Error::other)?
        .map_err(std::io::Error::other)?;
    DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(std::io::Error::other)
}
