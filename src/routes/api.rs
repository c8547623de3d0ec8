//! `/api` route table.

use crate::handlers::{admin, applications, auth, courses, engagement, faqs, universities, uploads};
use crate::routes::openapi::openapi_json;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn api_routes(upload_max_bytes: usize) -> Router<AppState> {
    let auth = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me).put(auth::update_me));

    let universities = Router::new()
        .route("/", get(universities::list).post(universities::create))
        .route("/countries", get(universities::countries))
        .route("/outcomes/:outcome_id", delete(universities::delete_outcome))
        .route(
            "/:id",
            get(universities::detail)
                .put(universities::update)
                .delete(universities::delete),
        )
        .route("/:id/courses", get(universities::courses))
        .route("/:id/outcomes", get(universities::outcomes).post(universities::upsert_outcome));

    let courses = Router::new()
        .route("/", get(courses::list).post(courses::create))
        .route("/:id", get(courses::read).put(courses::update).delete(courses::delete));

    let faqs = Router::new()
        .route("/", get(faqs::list).post(faqs::create))
        .route("/:id", put(faqs::update).delete(faqs::delete));

    let applications = Router::new()
        .route("/", get(applications::list).post(applications::create))
        .route("/:id", get(applications::read).delete(applications::withdraw))
        .route("/:id/status", put(applications::set_status));

    let wishlist = Router::new()
        .route("/", get(engagement::wishlist).post(engagement::save))
        .route("/:university_id", delete(engagement::unsave));

    let connect = Router::new()
        .route("/", get(engagement::suggestions))
        .route("/following", get(engagement::following))
        .route("/:user_id", post(engagement::follow).delete(engagement::unfollow));

    let admin = Router::new()
        .route(
            "/import",
            post(admin::import).layer(DefaultBodyLimit::max(admin::IMPORT_MAX_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/stats", get(admin::stats));

    Router::new()
        .nest("/auth", auth)
        .nest("/universities", universities)
        .nest("/courses", courses)
        .nest("/faqs", faqs)
        .nest("/applications", applications)
        .nest("/wishlist", wishlist)
        .nest("/connect", connect)
        .route("/quiz/recommend", post(engagement::recommend))
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_max_bytes + MULTIPART_OVERHEAD)),
        )
        .nest("/admin", admin)
        .route("/openapi.json", get(openapi_json))
}
