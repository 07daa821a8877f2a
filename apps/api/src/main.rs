//! Sanctum API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod rate_limit_sweeper;
mod state;

use std::net::SocketAddr;

use sanctum_core::AppError;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, RoleStoreConfig, init_tracing};
use crate::api_services::{build_api_services, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        if let RoleStoreConfig::Postgres { database_url } = &config.role_store {
            connect_and_migrate(database_url).await?;
        }
        info!("database migrations applied successfully");
        return Ok(());
    }

    if config.trusted_proxies.is_empty() {
        warn!("TRUSTED_PROXY_CIDRS is empty; identity headers are ignored and every caller is anonymous");
    }

    let services = build_api_services(&config).await?;
    let _sweeper =
        rate_limit_sweeper::spawn_sweeper(services.assist_limiter, config.rate_limit_sweep_interval);

    let app = api_router::build_router(services.state, &config.frontend_url)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        assist_max = config.assist_rate_limit_max,
        assist_window_ms = config.assist_rate_limit_window_ms,
        "sanctum-api listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
