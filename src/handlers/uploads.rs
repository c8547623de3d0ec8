//! Multipart file upload into the configured asset store.

use crate::error::{AppError, ErrorBody};
use crate::extractors::CurrentUser;
use crate::response::success_one;
use crate::state::AppState;
use crate::storage::{extension_for, magic_matches, object_key};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub size: usize,
    pub content_type: String,
}

pub(crate) fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("upload exceeds {} bytes", limit))
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Read a field fully, failing as soon as it grows past `limit`.
pub(crate) async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!("upload exceeds {} bytes", limit)));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[utoipa::path(
    post,
    path = "/api/uploads",
    request_body(content_type = "multipart/form-data", description = "Form field `file`"),
    responses(
        (status = 201, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported type", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 413, description = "File too large", body = ErrorBody)
    ),
    tag = "uploads"
)]
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.config.upload_max_bytes;
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_ascii_lowercase())
            .unwrap_or_default();
        let ext = extension_for(&content_type)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported content type '{}'", content_type)))?;
        let bytes = read_limited(field, limit).await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("file is empty".into()));
        }
        if !magic_matches(&content_type, &bytes) {
            return Err(AppError::BadRequest(format!("file content is not {}", content_type)));
        }
        let key = object_key(Utc::now(), ext);
        let size = bytes.len();
        let url = state.storage.put(&key, bytes, &content_type).await?;
        tracing::info!(user_id = %user.id, key = %key, size, "upload stored");
        return Ok(success_one(UploadResponse {
            url,
            key,
            size,
            content_type,
        }));
    }
    Err(AppError::BadRequest("missing 'file' field in multipart body".into()))
}
