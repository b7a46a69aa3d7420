//! Route configuration and setup.

mod health;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use reciva_core::constants::{MAX_BATCH_FILES, MAX_FILE_SIZE_BYTES};
use reciva_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

// Room for a full batch plus multipart framing overhead.
const REQUEST_BODY_LIMIT: usize = MAX_BATCH_FILES * MAX_FILE_SIZE_BYTES + 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/openapi.json", get(openapi_spec))
        .route(
            "/api/v1/receipts/process",
            post(handlers::upload::process_receipts),
        )
        .route("/api/v1/files", get(handlers::files::list_files))
        .route(
            "/api/v1/files/{id}",
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route("/api/v1/exports", post(handlers::exports::create_export))
        .route(
            "/api/v1/analytics/spending",
            get(handlers::analytics::spending_report),
        )
        .route("/api/v1/usage", get(handlers::usage::get_usage))
        .route(
            "/api/v1/webhooks/subscription",
            post(handlers::webhook::subscription_webhook),
        )
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.is_empty() || config.cors_origins.contains(&"*".to_string())
    {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };

    Ok(cors)
}
