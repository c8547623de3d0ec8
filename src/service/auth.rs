//! Accounts, password hashing and server-side sessions.
//!
//! Session tokens are random 32-byte values handed to the client; only their SHA-256
//! hex digest is stored.

use crate::error::AppError;
use crate::models::{RegisterRequest, Role, UpdateProfileRequest, UserRow};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, country, interests, avatar_url, bio, created_at, updated_at";

/// Argon2id hashing run on the blocking pool.
#[derive(Clone)]
pub struct Passwords {
    params: Params,
}

impl Passwords {
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;

    pub fn new() -> Result<Self, AppError> {
        Self::with_params(Self::MEMORY_COST, Self::TIME_COST, Self::PARALLELISM)
    }

    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| AppError::Internal(format!("argon2 params: {}", e)))?;
        Ok(Passwords { params })
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
        })
        .await
        .map_err(|e| AppError::Internal(format!("hash task: {}", e)))?
        .map_err(|e| AppError::Internal(format!("hash password: {}", e)))
    }

    /// False for a wrong password or an unparsable stored hash.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("verify task: {}", e)))
    }
}

/// New random session token (64 hex chars).
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService;

impl AuthService {
    pub async fn register(pool: &PgPool, passwords: &Passwords, req: &RegisterRequest) -> Result<UserRow, AppError> {
        let email = normalize_email(&req.email);
        let hash = passwords.hash(req.password.clone()).await?;
        let interests: Vec<String> = req.interests.iter().map(|i| i.trim().to_lowercase()).collect();
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, country, interests) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserRow>(&sql)
            .bind(req.name.trim())
            .bind(&email)
            .bind(&hash)
            .bind(req.country.as_deref().map(str::trim))
            .bind(&interests)
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("email is already registered".into())
                }
                other => AppError::Db(other),
            })?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password both yield `Unauthorized`.
    pub async fn login(pool: &PgPool, passwords: &Passwords, email: &str, password: &str) -> Result<UserRow, AppError> {
        let user = Self::find_by_email(pool, &normalize_email(email)).await?;
        let Some(user) = user else {
            return Err(AppError::Unauthorized);
        };
        if !passwords.verify(password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, UserRow>(&sql).bind(email).fetch_optional(pool).await?)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, UserRow>(&sql).bind(id).fetch_optional(pool).await?)
    }

    /// Create a session for `user_id`; returns the raw token for the client.
    pub async fn open_session(pool: &PgPool, user_id: Uuid, ttl_seconds: i64) -> Result<String, AppError> {
        let token = new_session_token();
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(hash_session_token(&token))
            .bind(user_id)
            .bind(expires_at)
            .execute(pool)
            .await?;
        Ok(token)
    }

    /// Resolve a raw token to its user. Expired sessions are deleted and treated as absent.
    pub async fn session_user(pool: &PgPool, token: &str) -> Result<Option<UserRow>, AppError> {
        let token_hash = hash_session_token(token);
        let sql = format!(
            "SELECT {}, s.expires_at < NOW() AS expired FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token_hash = $1",
            USER_COLUMNS
                .split(", ")
                .map(|c| format!("u.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let row = sqlx::query_as::<_, SessionUserRow>(&sql)
            .bind(&token_hash)
            .fetch_optional(pool)
            .await?;
        match row {
            Some(r) if r.expired => {
                Self::close_session(pool, token).await?;
                Ok(None)
            }
            Some(r) => Ok(Some(r.user)),
            None => Ok(None),
        }
    }

    pub async fn close_session(pool: &PgPool, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_session_token(token))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Replace `token` with a fresh one. `None` when the old session is unknown or expired.
    /// The old row is claimed by `DELETE ... RETURNING`; a token can be rotated at most once.
    pub async fn rotate_session(pool: &PgPool, token: &str, ttl_seconds: i64) -> Result<Option<(UserRow, String)>, AppError> {
        let mut tx = pool.begin().await?;
        let claimed: Option<Uuid> = sqlx::query_scalar(CLAIM_SESSION_SQL)
            .bind(hash_session_token(token))
            .fetch_optional(&mut *tx)
            .await?;
        let Some(user_id) = claimed else {
            return Ok(None);
        };
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let Some(user) = sqlx::query_as::<_, UserRow>(&sql).bind(user_id).fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };
        let fresh = new_session_token();
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(hash_session_token(&fresh))
            .bind(user.id)
            .bind(Utc::now() + Duration::seconds(ttl_seconds))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some((user, fresh)))
    }

    pub async fn purge_expired_sessions(pool: &PgPool) -> Result<u64, AppError> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(done.rows_affected())
    }

    pub async fn update_profile(pool: &PgPool, user_id: Uuid, req: &UpdateProfileRequest) -> Result<UserRow, AppError> {
        let interests: Option<Vec<String>> = req
            .interests
            .as_ref()
            .map(|v| v.iter().map(|i| i.trim().to_lowercase()).collect());
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), country = COALESCE($3, country), \
             interests = COALESCE($4, interests), bio = COALESCE($5, bio), avatar_url = COALESCE($6, avatar_url), \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .bind(req.name.as_deref().map(str::trim))
            .bind(req.country.as_deref().map(str::trim))
            .bind(interests)
            .bind(req.bio.as_deref())
            .bind(req.avatar_url.as_deref())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;
        Ok(user)
    }

    /// Create or promote the configured bootstrap admin.
    pub async fn ensure_admin(pool: &PgPool, passwords: &Passwords, email: &str, password: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let hash = passwords.hash(password.to_string()).await?;
        sqlx::query(
            "INSERT INTO users (name, email, password_hash, role) VALUES ('Administrator', $1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, password_hash = EXCLUDED.password_hash, updated_at = NOW()",
        )
        .bind(&email)
        .bind(&hash)
        .bind(Role::Admin)
        .execute(pool)
        .await?;
        tracing::info!(email = %email, "bootstrap admin ensured");
        Ok(())
    }
}

const CLAIM_SESSION_SQL: &str =
    "DELETE FROM sessions WHERE token_hash = $1 AND expires_at >= NOW() RETURNING user_id";

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    #[sqlx(flatten)]
    user: UserRow,
    expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Passwords {
        Passwords::with_params(4096, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let p = fast();
        let hash = p.hash("correct horse 1".into()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(p.verify("correct horse 1".into(), hash.clone()).await.unwrap());
        assert!(!p.verify("wrong horse 1".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_does_not_verify() {
        assert!(!fast().verify("anything1".into(), "not-a-phc-string".into()).await.unwrap());
    }

    #[test]
    fn session_tokens_are_random_and_hashed() {
        let a = new_session_token();
        let b = new_session_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        let h = hash_session_token(&a);
        assert_eq!(h.len(), 64);
        assert_ne!(h, a);
        assert_eq!(h, hash_session_token(&a));
    }

    #[test]
    fn rotation_claims_only_live_sessions() {
        assert!(CLAIM_SESSION_SQL.starts_with("DELETE FROM sessions"));
        assert!(CLAIM_SESSION_SQL.contains("expires_at >= NOW()"));
        assert!(CLAIM_SESSION_SQL.ends_with("RETURNING user_id"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
