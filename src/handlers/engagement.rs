//! Wishlist, connect and quiz endpoints.

use crate::error::{AppError, ErrorBody};
use crate::extractors::{CurrentUser, QueryParams, ValidJson};
use crate::models::*;
use crate::response::{success_many, success_page};
use crate::service::{ConnectService, QuizService, WishlistService};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses((status = 200, description = "Saved universities, newest first", body = [WishlistItem])),
    tag = "wishlist"
)]
pub async fn wishlist(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(WishlistService::list(&state.pool, user.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/wishlist",
    request_body = WishlistAdd,
    responses(
        (status = 201, description = "Saved"),
        (status = 200, description = "Already saved"),
        (status = 404, description = "Unknown university", body = ErrorBody)
    ),
    tag = "wishlist"
)]
pub async fn save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(body): ValidJson<WishlistAdd>,
) -> Result<StatusCode, AppError> {
    let created = WishlistService::add(&state.pool, user.id, body.university_id).await?;
    Ok(if created { StatusCode::CREATED } else { StatusCode::OK })
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{university_id}",
    params(("university_id" = Uuid, Path)),
    responses((status = 204, description = "Removed (or was not saved)")),
    tag = "wishlist"
)]
pub async fn unsave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(university_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    WishlistService::remove(&state.pool, user.id, university_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/connect",
    params(("limit" = Option<i64>, Query), ("cursor" = Option<String>, Query)),
    responses((status = 200, description = "Suggested peers, best match first", body = [Suggestion])),
    tag = "connect"
)]
pub async fn suggestions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    QueryParams(page): QueryParams<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, next) = ConnectService::suggestions(&state.pool, user.id, &page).await?;
    Ok(success_page(rows, next))
}

#[utoipa::path(
    get,
    path = "/api/connect/following",
    responses((status = 200, description = "Users the caller follows", body = [PublicProfile])),
    tag = "connect"
)]
pub async fn following(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(ConnectService::following(&state.pool, user.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/connect/{user_id}",
    params(("user_id" = Uuid, Path)),
    responses(
        (status = 204, description = "Following"),
        (status = 400, description = "Cannot follow yourself", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    ),
    tag = "connect"
)]
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConnectService::follow(&state.pool, user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/connect/{user_id}",
    params(("user_id" = Uuid, Path)),
    responses((status = 204, description = "Not following")),
    tag = "connect"
)]
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConnectService::unfollow(&state.pool, user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/quiz/recommend",
    request_body = QuizAnswers,
    responses(
        (status = 200, description = "Best matches first", body = [Recommendation]),
        (status = 400, description = "No question answered", body = ErrorBody)
    ),
    tag = "quiz"
)]
pub async fn recommend(State(state): State<AppState>, ValidJson(answers): ValidJson<QuizAnswers>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(QuizService::recommend(&state.pool, &answers).await?))
}
