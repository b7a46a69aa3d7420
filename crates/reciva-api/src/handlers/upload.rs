use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::upload::{UploadOrchestrator, UploadedPart};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use reciva_core::models::{MergedExport, ProcessedFileResponse, Receipt};
use reciva_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessBatchResponse {
    pub files: Vec<ProcessedFileResponse>,
    pub receipts: Vec<Receipt>,
    pub merged: MergedExport,
}

#[utoipa::path(
    post,
    path = "/api/v1/receipts/process",
    tag = "receipts",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Batch processed", body = ProcessBatchResponse),
        (status = 400, description = "Invalid batch", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 402, description = "Quota exceeded", body = ErrorResponse),
        (status = 502, description = "Extraction service failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn process_receipts(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    mut multipart: Multipart,
) -> Result<Json<ProcessBatchResponse>, HttpAppError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            // Non-file form fields are ignored.
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file {}: {}", filename, e)))?
            .to_vec();

        parts.push(UploadedPart {
            filename,
            content_type,
            data,
        });
    }

    if parts.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "No files provided".to_string(),
        )));
    }

    let orchestrator = UploadOrchestrator::new(&state);
    let result = orchestrator
        .process_batch(user.user_id, user.tier, parts)
        .await?;

    Ok(Json(ProcessBatchResponse {
        files: result.files,
        receipts: result.receipts,
        merged: result.merged,
    }))
}
