use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "course_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Diploma,
    Bachelor,
    Master,
    Phd,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub university_id: Uuid,
    pub name: String,
    pub level: CourseLevel,
    pub field: String,
    pub duration_months: i32,
    pub tuition_fee: Option<i64>,
    pub language: String,
    pub intake: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    #[serde(alias = "university_id")]
    pub university_id: Uuid,
    pub name: String,
    pub level: CourseLevel,
    pub field: String,
    #[serde(alias = "duration_months")]
    pub duration_months: i32,
    #[serde(default, alias = "tuition_fee")]
    pub tuition_fee: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub intake: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    pub name: Option<String>,
    pub level: Option<CourseLevel>,
    pub field: Option<String>,
    #[serde(alias = "duration_months")]
    pub duration_months: Option<i32>,
    #[serde(alias = "tuition_fee")]
    pub tuition_fee: Option<i64>,
    pub language: Option<String>,
    pub intake: Option<String>,
    pub description: Option<String>,
}

/// Query string for course listings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub q: Option<String>,
    pub university_id: Option<Uuid>,
    pub level: Option<CourseLevel>,
    pub field: Option<String>,
    pub max_tuition: Option<i64>,
    pub max_duration: Option<i32>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}
