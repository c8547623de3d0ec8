//! Admin-only catalog import and dashboard statistics.

use crate::error::{AppError, ErrorBody};
use crate::extractors::AdminUser;
use crate::handlers::uploads::{multipart_error, read_limited};
use crate::models::{CatalogStats, ImportSummary};
use crate::response::success_one_ok;
use crate::service::catalog::read_bundle;
use crate::service::CatalogService;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;

/// Catalog archives may be larger than user uploads.
pub const IMPORT_MAX_BYTES: usize = 32 * 1024 * 1024;

#[utoipa::path(
    post,
    path = "/api/admin/import",
    request_body(content_type = "multipart/form-data", description = "Form field `file`: zip with universities.json, courses.json, faqs.json"),
    responses(
        (status = 200, description = "Counts per kind", body = ImportSummary),
        (status = 400, description = "Bad archive or records", body = ErrorBody),
        (status = 413, description = "Archive or entry too large", body = ErrorBody),
        (status = 403, description = "Admin only", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn import(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut zip_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, IMPORT_MAX_BYTES))?
    {
        if field.name() == Some("file") {
            zip_bytes = Some(read_limited(field, IMPORT_MAX_BYTES).await?);
            break;
        }
    }
    let zip_bytes = zip_bytes.ok_or_else(|| AppError::BadRequest("missing 'file' field in multipart body".into()))?;
    let bundle = tokio::task::spawn_blocking(move || read_bundle(zip_bytes))
        .await
        .map_err(|e| AppError::Internal(format!("import task: {}", e)))??;
    let summary = CatalogService::import(&state.pool, &bundle).await?;
    tracing::info!(admin_id = %admin.id, "catalog import finished");
    Ok(success_one_ok(summary))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Totals", body = CatalogStats), (status = 403, description = "Admin only", body = ErrorBody)),
    tag = "admin"
)]
pub async fn stats(State(state): State<AppState>, AdminUser(_): AdminUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CatalogService::stats(&state.pool).await?))
}
