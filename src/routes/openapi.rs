use crate::error::{ErrorBody, ErrorDetail};
use crate::handlers::{self, auth::AuthResponse, uploads::UploadResponse};
use crate::models::*;
use crate::response::PageMeta;
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::update_me,
        handlers::universities::list,
        handlers::universities::countries,
        handlers::universities::detail,
        handlers::universities::create,
        handlers::universities::update,
        handlers::universities::delete,
        handlers::universities::courses,
        handlers::universities::outcomes,
        handlers::universities::upsert_outcome,
        handlers::universities::delete_outcome,
        handlers::courses::list,
        handlers::courses::read,
        handlers::courses::create,
        handlers::courses::update,
        handlers::courses::delete,
        handlers::faqs::list,
        handlers::faqs::create,
        handlers::faqs::update,
        handlers::faqs::delete,
        handlers::applications::create,
        handlers::applications::list,
        handlers::applications::read,
        handlers::applications::set_status,
        handlers::applications::withdraw,
        handlers::engagement::wishlist,
        handlers::engagement::save,
        handlers::engagement::unsave,
        handlers::engagement::suggestions,
        handlers::engagement::following,
        handlers::engagement::follow,
        handlers::engagement::unfollow,
        handlers::engagement::recommend,
        handlers::uploads::upload,
        handlers::admin::import,
        handlers::admin::stats
    ),
    components(schemas(
        ErrorBody,
        ErrorDetail,
        PageMeta,
        AuthResponse,
        UploadResponse,
        UserView,
        Role,
        RegisterRequest,
        LoginRequest,
        UpdateProfileRequest,
        PublicProfile,
        University,
        UniversityDetail,
        UniversityInput,
        UniversityPatch,
        UniversitySort,
        CountryFacet,
        CareerOutcome,
        OutcomeInput,
        Course,
        CourseLevel,
        CourseInput,
        CoursePatch,
        Faq,
        FaqInput,
        FaqPatch,
        Application,
        ApplicationStatus,
        ApplicationInput,
        StatusUpdate,
        WishlistItem,
        WishlistAdd,
        Suggestion,
        QuizAnswers,
        Recommendation,
        ImportSummary,
        CatalogStats
    )),
    tags(
        (name = "auth", description = "Accounts and sessions"),
        (name = "universities", description = "University catalog"),
        (name = "courses", description = "Programmes offered"),
        (name = "faqs", description = "Frequently asked questions"),
        (name = "applications", description = "Study applications"),
        (name = "wishlist", description = "Saved universities"),
        (name = "connect", description = "Peer suggestions and follows"),
        (name = "quiz", description = "Recommendations"),
        (name = "uploads", description = "File uploads"),
        (name = "admin", description = "Catalog administration")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
