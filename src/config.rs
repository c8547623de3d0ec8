//! Runtime configuration from environment (optionally seeded from a `.env` file).

use crate::error::ConfigError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

/// Where uploaded assets are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    /// Local directory served back under `public_base`.
    Local { dir: String, public_base: String },
    /// S3 bucket; `public_base` is the URL prefix objects are reachable under.
    S3 { bucket: String, public_base: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub session_ttl_seconds: i64,
    pub session_cookie_secure: bool,
    /// Accept `x-user-id` as the caller identity. Only for deployments behind a trusted proxy.
    pub trust_user_id_header: bool,
    pub upload_max_bytes: usize,
    pub storage: StorageConfig,
    pub cors_origin: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|s| s.trim()).filter(|s| !s.is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?
            .to_string();

        let storage = match get("S3_BUCKET") {
            Some(bucket) => StorageConfig::S3 {
                bucket: bucket.to_string(),
                public_base: get("S3_PUBLIC_BASE")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket)),
            },
            None => StorageConfig::Local {
                dir: get("UPLOAD_DIR").unwrap_or("./uploads").to_string(),
                public_base: get("UPLOAD_PUBLIC_BASE").unwrap_or("/uploads").to_string(),
            },
        };

        let session_ttl_seconds: i64 = parse_or(vars, "SESSION_TTL_SECONDS", 7 * 24 * 3600)?;
        if session_ttl_seconds <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_SECONDS",
                message: "must be positive".into(),
            });
        }

        let admin_email = get("ADMIN_EMAIL").map(str::to_lowercase);
        let admin_password = get("ADMIN_PASSWORD").map(str::to_string);
        if admin_email.is_some() != admin_password.is_some() {
            tracing::warn!("ADMIN_EMAIL and ADMIN_PASSWORD must both be set; admin bootstrap disabled");
        }

        Ok(Config {
            database_url,
            bind_addr: parse_or(vars, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: parse_or(vars, "DB_MAX_CONNECTIONS", 10)?,
            session_ttl_seconds,
            session_cookie_secure: parse_or(vars, "SESSION_COOKIE_SECURE", false)?,
            trust_user_id_header: parse_or(vars, "TRUST_USER_ID_HEADER", false)?,
            upload_max_bytes: parse_or(vars, "UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            storage,
            cors_origin: get("CORS_ORIGIN").map(str::to_string),
            admin_email: admin_email.filter(|_| admin_password.is_some()),
            admin_password: admin_password.filter(|_| get("ADMIN_EMAIL").is_some()),
            log_json: get("LOG_FORMAT").map(|f| f.eq_ignore_ascii_case("json")).unwrap_or(false),
        })
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}
