//! UniHub: university discovery and study-abroad consulting REST backend on PostgreSQL.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;
pub mod store;

pub use config::{Config, StorageConfig};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one, success_page};
pub use routes::{api_routes, app, common_routes};
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
