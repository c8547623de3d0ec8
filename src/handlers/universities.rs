//! University catalog endpoints. Reads are public, writes need an admin session.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{AdminUser, QueryParams, ValidJson};
use crate::models::*;
use crate::response::{success_many, success_one, success_one_ok, success_page};
use crate::service::{CourseService, UniversityService};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/universities",
    params(
        ("q" = Option<String>, Query, description = "Substring of name, city or country"),
        ("country" = Option<String>, Query),
        ("city" = Option<String>, Query),
        ("min_tuition" = Option<i64>, Query),
        ("max_tuition" = Option<i64>, Query),
        ("max_ranking" = Option<i32>, Query),
        ("featured" = Option<bool>, Query),
        ("sort" = Option<UniversitySort>, Query),
        ("limit" = Option<i64>, Query, description = "1 to 100, default 20"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from meta.nextCursor")
    ),
    responses(
        (status = 200, description = "Page of universities", body = [University]),
        (status = 400, description = "Bad filter or cursor", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<UniversityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, next) = UniversityService::list(&state.pool, &query).await?;
    Ok(success_page(rows, next))
}

#[utoipa::path(
    get,
    path = "/api/universities/countries",
    responses((status = 200, description = "Countries with university counts", body = [CountryFacet])),
    tag = "universities"
)]
pub async fn countries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(UniversityService::countries(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/api/universities/{id}",
    params(("id" = String, Path, description = "University id or slug")),
    responses(
        (status = 200, description = "University with course count and outcomes", body = UniversityDetail),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(UniversityService::detail(&state.pool, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/universities",
    request_body = UniversityInput,
    responses(
        (status = 201, description = "Created", body = University),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Admin only", body = ErrorBody),
        (status = 409, description = "Slug taken", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidJson(body): ValidJson<UniversityInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(UniversityService::create(&state.pool, &body).await?))
}

#[utoipa::path(
    put,
    path = "/api/universities/{id}",
    params(("id" = Uuid, Path)),
    request_body = UniversityPatch,
    responses(
        (status = 200, description = "Updated", body = University),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<UniversityPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(UniversityService::update(&state.pool, id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/api/universities/{id}",
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Deleted with its courses and outcomes"),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    UniversityService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/universities/{id}/courses",
    params(("id" = String, Path, description = "University id or slug")),
    responses(
        (status = 200, description = "Courses offered", body = [Course]),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(mut query): QueryParams<CourseQuery>,
) -> Result<impl IntoResponse, AppError> {
    let university = UniversityService::find(&state.pool, &id).await?;
    query.university_id = Some(university.id);
    let (rows, next) = CourseService::list(&state.pool, &query).await?;
    Ok(success_page(rows, next))
}

#[utoipa::path(
    get,
    path = "/api/universities/{id}/outcomes",
    params(("id" = String, Path, description = "University id or slug")),
    responses((status = 200, description = "Career outcomes, newest year first", body = [CareerOutcome])),
    tag = "universities"
)]
pub async fn outcomes(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let university = UniversityService::find(&state.pool, &id).await?;
    Ok(success_many(UniversityService::outcomes(&state.pool, university.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/universities/{id}/outcomes",
    params(("id" = Uuid, Path)),
    request_body = OutcomeInput,
    responses(
        (status = 201, description = "Outcome stored for that year", body = CareerOutcome),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "universities"
)]
pub async fn upsert_outcome(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<OutcomeInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(UniversityService::upsert_outcome(&state.pool, id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/api/universities/outcomes/{outcome_id}",
    params(("outcome_id" = Uuid, Path)),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Unknown outcome", body = ErrorBody)),
    tag = "universities"
)]
pub async fn delete_outcome(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(outcome_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    UniversityService::delete_outcome(&state.pool, outcome_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
