//! Router assembly: health and version routes at the root, the JSON API under `/api`.

mod api;
mod common;
pub mod openapi;

pub use api::api_routes;
pub use common::common_routes;

use crate::config::StorageConfig;
use crate::state::AppState;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Full application router with tracing, optional CORS and local upload serving.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(common_routes())
        .nest("/api", api_routes(state.config.upload_max_bytes));

    if let StorageConfig::Local { dir, public_base } = &state.config.storage {
        let mount = format!("/{}", public_base.trim_matches('/'));
        if mount != "/" && !public_base.starts_with("http") {
            router = router.nest_service(&mount, ServeDir::new(dir));
        }
    }

    if let Some(origin) = state.config.cors_origin.as_deref() {
        match HeaderValue::from_str(origin) {
            Ok(origin) => {
                router = router.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_credentials(true)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
                );
            }
            Err(e) => tracing::warn!(origin = %origin, error = %e, "ignoring invalid CORS_ORIGIN"),
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
