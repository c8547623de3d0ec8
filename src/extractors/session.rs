//! Caller identity from the session cookie or a bearer token.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Role, UserRow};
use crate::service::AuthService;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{InvalidHeaderValue, AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "unihub_session";

/// Identity header honored only when `TRUST_USER_ID_HEADER` is set.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Raw session token from `Authorization: Bearer` or the session cookie, bearer first.
#[derive(Clone, Debug)]
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(extract_session_token(&parts.headers)))
    }
}

/// Signed-in user; rejects with 401.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub UserRow);

/// Signed-in admin; 401 without a session, 403 for students.
#[derive(Clone, Debug)]
pub struct AdminUser(pub UserRow);

/// Signed-in student; 401 without a session, 403 for admins.
#[derive(Clone, Debug)]
pub struct StudentUser(pub UserRow);

/// Signed-in user when there is one.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<UserRow>);

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<UserRow>, AppError> {
    if let Some(token) = extract_session_token(&parts.headers) {
        return AuthService::session_user(&state.pool, &token).await;
    }
    if state.config.trust_user_id_header {
        if let Some(id) = extract_user_id(&parts.headers) {
            return AuthService::find_by_id(&state.pool, id).await;
        }
    }
    Ok(None)
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?.map(CurrentUser).ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin role required".into()));
        }
        Ok(AdminUser(user))
    }
}

fn require_student(user: UserRow) -> Result<UserRow, AppError> {
    if user.role != Role::Student {
        return Err(AppError::Forbidden("student account required".into()));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for StudentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_student(user).map(StudentUser)
    }
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(config: &Config, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl = config.session_ttl_seconds;
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl}");
    if config.session_cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(config: &Config) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty()).then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn extract_user_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    fn config(secure: bool) -> Config {
        let mut vars = HashMap::new();
        vars.insert("DATABASE_URL".to_string(), "postgres://localhost/unihub".to_string());
        vars.insert("SESSION_TTL_SECONDS".to_string(), "3600".to_string());
        if secure {
            vars.insert("SESSION_COOKIE_SECURE".to_string(), "true".to_string());
        }
        Config::from_vars(&vars).unwrap()
    }

    fn user_with(role: Role) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role,
            country: None,
            interests: Vec::new(),
            avatar_url: None,
            bio: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn only_students_pass_the_student_check() {
        assert!(require_student(user_with(Role::Student)).is_ok());
        assert!(matches!(require_student(user_with(Role::Admin)), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[("authorization", "Bearer abc"), ("cookie", "unihub_session=def")]);
        assert_eq!(extract_session_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let h = headers(&[("cookie", "theme=dark; unihub_session=tok123; lang=en")]);
        assert_eq!(extract_session_token(&h).as_deref(), Some("tok123"));
    }

    #[test]
    fn empty_values_are_ignored() {
        assert!(extract_session_token(&headers(&[("authorization", "Bearer   ")])).is_none());
        assert!(extract_session_token(&headers(&[("cookie", "unihub_session=")])).is_none());
        assert!(extract_session_token(&headers(&[("authorization", "Basic Zm9v")])).is_none());
    }

    #[test]
    fn user_id_header_must_be_a_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(extract_user_id(&headers(&[("x-user-id", &id.to_string())])), Some(id));
        assert_eq!(extract_user_id(&headers(&[("x-user-id", "42")])), None);
    }

    #[test]
    fn cookie_attributes() {
        let set = session_cookie(&config(false), "tok").unwrap();
        assert_eq!(set.to_str().unwrap(), "unihub_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600");
        let cleared = clear_session_cookie(&config(true)).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
        assert!(cleared.to_str().unwrap().ends_with("; Secure"));
    }
}
