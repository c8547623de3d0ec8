//! Shared application state for all routes.

use crate::config::Config;
use crate::service::Passwords;
use crate::storage::AssetStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub passwords: Passwords,
    pub storage: Arc<dyn AssetStore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, passwords: Passwords, storage: Arc<dyn AssetStore>) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
            passwords,
            storage,
        }
    }
}
