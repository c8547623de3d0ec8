use crate::error::{AppError, ErrorBody};
use crate::extractors::{AdminUser, QueryParams, ValidJson};
use crate::models::*;
use crate::response::{success_one, success_one_ok, success_page};
use crate::service::CourseService;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/courses",
    params(
        ("q" = Option<String>, Query, description = "Substring of name or field"),
        ("university_id" = Option<Uuid>, Query),
        ("level" = Option<CourseLevel>, Query),
        ("field" = Option<String>, Query),
        ("max_tuition" = Option<i64>, Query),
        ("max_duration" = Option<i32>, Query, description = "Months"),
        ("limit" = Option<i64>, Query),
        ("cursor" = Option<String>, Query)
    ),
    responses(
        (status = 200, description = "Page of courses", body = [Course]),
        (status = 400, description = "Bad filter or cursor", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn list(State(state): State<AppState>, QueryParams(query): QueryParams<CourseQuery>) -> Result<impl IntoResponse, AppError> {
    let (rows, next) = CourseService::list(&state.pool, &query).await?;
    Ok(success_page(rows, next))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path)),
    responses((status = 200, description = "OK", body = Course), (status = 404, description = "Not found", body = ErrorBody)),
    tag = "courses"
)]
pub async fn read(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CourseService::get(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CourseInput,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Invalid input or unknown university", body = ErrorBody),
        (status = 409, description = "Same name and level already offered", body = ErrorBody)
    ),
    tag = "courses"
)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidJson(body): ValidJson<CourseInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(CourseService::create(&state.pool, &body).await?))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path)),
    request_body = CoursePatch,
    responses((status = 200, description = "OK", body = Course), (status = 404, description = "Not found", body = ErrorBody)),
    tag = "courses"
)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<CoursePatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CourseService::update(&state.pool, id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path)),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found", body = ErrorBody)),
    tag = "courses"
)]
pub async fn delete(State(state): State<AppState>, AdminUser(_): AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    CourseService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
