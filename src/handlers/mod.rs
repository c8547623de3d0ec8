//! HTTP handlers, one module per resource.

pub mod admin;
pub mod applications;
pub mod auth;
pub mod courses;
pub mod engagement;
pub mod faqs;
pub mod universities;
pub mod uploads;
