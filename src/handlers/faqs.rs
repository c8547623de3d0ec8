use crate::error::{AppError, ErrorBody};
use crate::extractors::{AdminUser, MaybeUser, QueryParams, ValidJson};
use crate::models::*;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::FaqService;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

/// Published entries only, unless an admin asks for `all=true`.
#[utoipa::path(
    get,
    path = "/api/faqs",
    params(
        ("category" = Option<String>, Query),
        ("all" = Option<bool>, Query, description = "Admins only: include unpublished")
    ),
    responses((status = 200, description = "FAQ entries in display order", body = [Faq])),
    tag = "faqs"
)]
pub async fn list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    QueryParams(query): QueryParams<FaqQuery>,
) -> Result<impl IntoResponse, AppError> {
    let include_unpublished = query.all && user.as_ref().map(|u| u.is_admin()).unwrap_or(false);
    let rows = FaqService::list(&state.pool, query.category.as_deref(), include_unpublished).await?;
    Ok(success_many(rows))
}

#[utoipa::path(
    post,
    path = "/api/faqs",
    request_body = FaqInput,
    responses((status = 201, description = "Created", body = Faq), (status = 400, description = "Invalid input", body = ErrorBody), (status = 403, description = "Admin only", body = ErrorBody)),
    tag = "faqs"
)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidJson(body): ValidJson<FaqInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(FaqService::create(&state.pool, &body).await?))
}

#[utoipa::path(
    put,
    path = "/api/faqs/{id}",
    params(("id" = Uuid, Path)),
    request_body = FaqPatch,
    responses((status = 200, description = "OK", body = Faq), (status = 404, description = "Not found", body = ErrorBody)),
    tag = "faqs"
)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<FaqPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(FaqService::update(&state.pool, id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/api/faqs/{id}",
    params(("id" = Uuid, Path)),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found", body = ErrorBody)),
    tag = "faqs"
)]
pub async fn delete(State(state): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    FaqService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
