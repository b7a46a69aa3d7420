use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use base64::Engine;
use reciva_core::models::{ExportFormat, MergedExport};
use reciva_services::{export, quota};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    pub merged_data: MergedExport,
    pub format: ExportFormat,
}

#[utoipa::path(
    post,
    path = "/api/v1/exports",
    tag = "exports",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Rendered export; Excel bodies are base64-encoded"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 402, description = "Format requires premium", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_export(
    State(_state): State<Arc<AppState>>,
    user: UserContext,
    ValidatedJson(request): ValidatedJson<ExportRequest>,
) -> Result<Response, HttpAppError> {
    quota::ensure_export_allowed(user.tier, request.format)?;

    let artifact = export::render(&request.merged_data, request.format)?;

    // Binary workbooks travel as base64 text; CSV and JSON go out as-is.
    let body = match request.format {
        ExportFormat::Excel => base64::engine::general_purpose::STANDARD
            .encode(&artifact.bytes)
            .into_bytes(),
        ExportFormat::Csv | ExportFormat::Json => artifact.bytes,
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename),
            ),
        ],
        body,
    )
        .into_response())
}
