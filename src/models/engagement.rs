//! Wishlist, follow suggestions and quiz answers.

use super::course::CourseLevel;
use super::university::University;
use super::user::PublicProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    #[sqlx(flatten)]
    pub university: University,
    pub saved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WishlistAdd {
    #[serde(alias = "university_id")]
    pub university_id: Uuid,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub user: PublicProfile,
    pub score: i64,
    pub shared_interests: Vec<String>,
    pub shared_universities: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswers {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default, alias = "max_budget")]
    pub max_budget: Option<i64>,
    #[serde(default)]
    pub level: Option<CourseLevel>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, alias = "prefer_ranked")]
    pub prefer_ranked: bool,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub university: University,
    pub score: i64,
    pub reasons: Vec<String>,
}
