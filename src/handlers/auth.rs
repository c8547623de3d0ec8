//! Registration, login and session endpoints.

use crate::error::{AppError, ErrorBody};
use crate::extractors::session::{clear_session_cookie, session_cookie};
use crate::extractors::{CurrentUser, SessionToken, ValidJson};
use crate::models::{LoginRequest, RegisterRequest, UpdateProfileRequest, UserView};
use crate::response::{success_one, success_one_ok};
use crate::service::AuthService;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa::ToSchema;

/// Signed-in user plus the session token (also set as a cookie).
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

fn cookie_or_500(value: Result<HeaderValue, axum::http::header::InvalidHeaderValue>) -> Result<HeaderValue, AppError> {
    value.map_err(|e| AppError::Internal(format!("session cookie: {}", e)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::register(&state.pool, &state.passwords, &body).await?;
    let token = AuthService::open_session(&state.pool, user.id, state.config.session_ttl_seconds).await?;
    let cookie = cookie_or_500(session_cookie(&state.config, &token))?;
    let (status, json) = success_one(AuthResponse {
        user: user.into(),
        token,
    });
    Ok((status, [(SET_COOKIE, cookie)], json))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Wrong email or password", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = match AuthService::login(&state.pool, &state.passwords, &body.email, &body.password).await {
        Ok(u) => u,
        Err(AppError::Unauthorized) => {
            tracing::info!("failed login attempt");
            return Err(AppError::Unauthorized);
        }
        Err(e) => return Err(e),
    };
    let token = AuthService::open_session(&state.pool, user.id, state.config.session_ttl_seconds).await?;
    let cookie = cookie_or_500(session_cookie(&state.config, &token))?;
    tracing::info!(user_id = %user.id, "user signed in");
    let (status, json) = success_one_ok(AuthResponse {
        user: user.into(),
        token,
    });
    Ok((status, [(SET_COOKIE, cookie)], json))
}

/// Always clears the cookie, even without a live session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Signed out")),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, SessionToken(token): SessionToken) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = token {
        AuthService::close_session(&state.pool, &token).await?;
    }
    let cookie = cookie_or_500(clear_session_cookie(&state.config))?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Session rotated", body = AuthResponse),
        (status = 401, description = "No live session", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(State(state): State<AppState>, SessionToken(token): SessionToken) -> Result<impl IntoResponse, AppError> {
    let token = token.ok_or(AppError::Unauthorized)?;
    let (user, fresh) = AuthService::rotate_session(&state.pool, &token, state.config.session_ttl_seconds)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let cookie = cookie_or_500(session_cookie(&state.config, &fresh))?;
    let (status, json) = success_one_ok(AuthResponse {
        user: user.into(),
        token: fresh,
    });
    Ok((status, [(SET_COOKIE, cookie)], json))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserView),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    success_one_ok(UserView::from(user))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserView),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(body): ValidJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = AuthService::update_profile(&state.pool, user.id, &body).await?;
    Ok(success_one_ok(UserView::from(updated)))
}
