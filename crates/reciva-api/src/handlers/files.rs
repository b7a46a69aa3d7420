use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use reciva_core::models::ProcessedFileResponse;
use reciva_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<ProcessedFileResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "files",
    params(
        ("limit" = Option<i64>, Query, description = "Page size (max 200, default 50)"),
        ("offset" = Option<i64>, Query, description = "Page offset")
    ),
    responses(
        (status = 200, description = "User's processed files, newest first", body = FileListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListResponse>, HttpAppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let files = state
        .db
        .file_repository
        .list(user.user_id, limit, offset)
        .await?;
    let total = state.db.file_repository.count_for_user(user.user_id).await?;

    Ok(Json(FileListResponse {
        files: files.into_iter().map(ProcessedFileResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "Processed file id")),
    responses(
        (status = 200, description = "File details", body = ProcessedFileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessedFileResponse>, HttpAppError> {
    let file = state
        .db
        .file_repository
        .get(user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

    Ok(Json(ProcessedFileResponse::from(file)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "Processed file id")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let file = state
        .db
        .file_repository
        .delete(user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

    // The row is the source of truth; an orphaned object is picked up by
    // nothing, so a failed storage delete is only logged.
    if let Err(err) = state.processing.storage.delete(&file.storage_key).await {
        tracing::error!(
            error = %err,
            storage_key = %file.storage_key,
            "Failed to delete storage object for removed file"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
