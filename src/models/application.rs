use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    /// Moves an admin may make.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, UnderReview) | (Pending, Accepted) | (Pending, Rejected) | (UnderReview, Accepted) | (UnderReview, Rejected)
        )
    }

    /// Whether the applicant can still withdraw.
    pub fn is_withdrawable(self) -> bool {
        matches!(self, ApplicationStatus::Pending | ApplicationStatus::UnderReview)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub university_id: Uuid,
    pub course_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub statement: String,
    pub document_urls: Vec<String>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    #[serde(alias = "university_id")]
    pub university_id: Uuid,
    #[serde(default, alias = "course_id")]
    pub course_id: Option<Uuid>,
    pub statement: String,
    #[serde(default, alias = "document_urls")]
    pub document_urls: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    #[serde(default, alias = "admin_note")]
    pub admin_note: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub university_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;

    #[test]
    fn review_flow_is_forward_only() {
        assert!(Pending.can_transition_to(UnderReview));
        assert!(Pending.can_transition_to(Accepted));
        assert!(UnderReview.can_transition_to(Rejected));
        assert!(!Accepted.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Accepted));
        assert!(!UnderReview.can_transition_to(Pending));
    }

    #[test]
    fn admins_cannot_withdraw_on_behalf_of_applicants() {
        for s in [Pending, UnderReview, Accepted, Rejected, Withdrawn] {
            assert!(!s.can_transition_to(Withdrawn));
        }
    }

    #[test]
    fn only_open_applications_are_withdrawable() {
        assert!(Pending.is_withdrawable());
        assert!(UnderReview.is_withdrawable());
        assert!(!Accepted.is_withdrawable());
        assert!(!Withdrawn.is_withdrawable());
    }
}
