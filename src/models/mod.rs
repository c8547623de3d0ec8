//! Row and request/response types. JSON uses camelCase keys; request bodies also
//! accept the snake_case spelling of every field.

pub mod application;
pub mod catalog;
pub mod course;
pub mod engagement;
pub mod faq;
pub mod outcome;
pub mod university;
pub mod user;

pub use application::*;
pub use catalog::*;
pub use course::*;
pub use engagement::*;
pub use faq::*;
pub use outcome::*;
pub use university::*;
pub use user::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Validate;
    use serde_json::json;

    #[test]
    fn quiz_accepts_snake_case_answers() {
        let answers: QuizAnswers = serde_json::from_value(json!({"max_budget": 15000, "prefer_ranked": true})).unwrap();
        assert_eq!(answers.max_budget, Some(15000));
        assert!(answers.prefer_ranked);
        assert!(answers.validate().is_ok());
    }

    #[test]
    fn status_update_keeps_the_admin_note() {
        let update: StatusUpdate =
            serde_json::from_value(json!({"status": "accepted", "admin_note": "Scholarship offered"})).unwrap();
        assert_eq!(update.status, ApplicationStatus::Accepted);
        assert_eq!(update.admin_note.as_deref(), Some("Scholarship offered"));
    }

    #[test]
    fn both_spellings_name_the_same_field() {
        let id = uuid::Uuid::new_v4();
        let snake: WishlistAdd = serde_json::from_value(json!({"university_id": id})).unwrap();
        let camel: WishlistAdd = serde_json::from_value(json!({"universityId": id})).unwrap();
        assert_eq!(snake.university_id, camel.university_id);

        let profile: UpdateProfileRequest =
            serde_json::from_value(json!({"avatar_url": "https://cdn.example.com/a.png"})).unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    }
}
