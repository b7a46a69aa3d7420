//! Application setup and initialization
//!
//! All startup wiring lives here so `main.rs` stays a thin entry point:
//! configuration validation, tracing, database pool and migrations, storage
//! backend, service construction, and route assembly.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod telemetry;

use crate::state::AppState;
use anyhow::{Context, Result};
use reciva_core::Config;
use std::sync::Arc;

/// Initialize the entire application.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration, before anything connects.
    config.validate().context("Configuration validation failed")?;

    telemetry::init_tracing(&config);

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, pool, storage).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
