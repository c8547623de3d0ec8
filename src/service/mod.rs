//! Domain services. Each runs its SQL against the pool handed in by the handler.

pub mod applications;
pub mod auth;
pub mod catalog;
pub mod connect;
pub mod courses;
pub mod faqs;
pub mod quiz;
pub mod universities;
pub mod validation;
pub mod wishlist;

pub use applications::{ApplicationService, Viewer};
pub use auth::{AuthService, Passwords};
pub use catalog::CatalogService;
pub use connect::ConnectService;
pub use courses::CourseService;
pub use faqs::FaqService;
pub use quiz::QuizService;
pub use universities::UniversityService;
pub use validation::Validate;
pub use wishlist::WishlistService;
