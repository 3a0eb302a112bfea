//! jobgate API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;
mod sweeper;

use std::sync::Arc;

use jobgate_core::{AppError, Clock, SystemClock};
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_services::build_app_state;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = build_app_state(&config, clock)?;

    let _sweeper = sweeper::spawn_sweeper(app_state.clone(), config.sweep_interval);

    let address = config.socket_address()?;
    let app = api_router::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind API listener: {error}")))?;

    info!(%address, "jobgate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("API server failed: {error}")))
}
