pub mod request;
pub mod session;

pub use request::{QueryParams, ValidJson};
pub use session::{AdminUser, CurrentUser, MaybeUser, SessionToken, StudentUser};
