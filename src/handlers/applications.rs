//! Student applications and admin review.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{AdminUser, CurrentUser, QueryParams, StudentUser, ValidJson};
use crate::models::*;
use crate::response::{success_one, success_one_ok, success_page};
use crate::service::{ApplicationService, Viewer};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

fn viewer(user: &UserRow) -> Viewer {
    Viewer {
        user_id: user.id,
        is_admin: user.is_admin(),
    }
}

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = ApplicationInput,
    responses(
        (status = 201, description = "Submitted as pending", body = Application),
        (status = 400, description = "Invalid input, or course not offered by the university", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Only student accounts apply", body = ErrorBody),
        (status = 409, description = "An open application already exists", body = ErrorBody)
    ),
    tag = "applications"
)]
pub async fn create(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    ValidJson(body): ValidJson<ApplicationInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(ApplicationService::submit(&state.pool, user.id, &body).await?))
}

/// Students see their own; admins see all and may filter by user.
#[utoipa::path(
    get,
    path = "/api/applications",
    params(
        ("status" = Option<ApplicationStatus>, Query),
        ("university_id" = Option<Uuid>, Query),
        ("user_id" = Option<Uuid>, Query, description = "Admins only"),
        ("limit" = Option<i64>, Query),
        ("cursor" = Option<String>, Query)
    ),
    responses((status = 200, description = "Newest first", body = [Application])),
    tag = "applications"
)]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<ApplicationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, next) = ApplicationService::list(&state.pool, viewer(&user), &query).await?;
    Ok(success_page(rows, next))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(("id" = Uuid, Path)),
    responses(
        (status = 200, description = "OK", body = Application),
        (status = 404, description = "Unknown, or owned by someone else", body = ErrorBody)
    ),
    tag = "applications"
)]
pub async fn read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(ApplicationService::get(&state.pool, viewer(&user), id).await?))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/status",
    params(("id" = Uuid, Path)),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = Application),
        (status = 403, description = "Admin only", body = ErrorBody),
        (status = 409, description = "Transition not allowed", body = ErrorBody)
    ),
    tag = "applications"
)]
pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<StatusUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let row = ApplicationService::set_status(&state.pool, id, &body).await?;
    tracing::info!(admin_id = %admin.id, application_id = %id, "application reviewed");
    Ok(success_one_ok(row))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    params(("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Withdrawn", body = Application),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Already decided", body = ErrorBody)
    ),
    tag = "applications"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(ApplicationService::withdraw(&state.pool, user.id, id).await?))
}
