use super::outcome::CareerOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub country: String,
    pub city: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub world_ranking: Option<i32>,
    pub tuition_fee_min: Option<i64>,
    pub tuition_fee_max: Option<i64>,
    pub acceptance_rate: Option<f64>,
    pub student_count: Option<i32>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// University with its course count and published career outcomes.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniversityDetail {
    #[serde(flatten)]
    pub university: University,
    pub course_count: i64,
    pub outcomes: Vec<CareerOutcome>,
}

/// Create body. `slug` is derived from `name` when omitted.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniversityInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, alias = "logo_url")]
    pub logo_url: Option<String>,
    #[serde(default, alias = "world_ranking")]
    pub world_ranking: Option<i32>,
    #[serde(default, alias = "tuition_fee_min")]
    pub tuition_fee_min: Option<i64>,
    #[serde(default, alias = "tuition_fee_max")]
    pub tuition_fee_max: Option<i64>,
    #[serde(default, alias = "acceptance_rate")]
    pub acceptance_rate: Option<f64>,
    #[serde(default, alias = "student_count")]
    pub student_count: Option<i32>,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update: absent fields keep their stored value.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniversityPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    #[serde(alias = "logo_url")]
    pub logo_url: Option<String>,
    #[serde(alias = "world_ranking")]
    pub world_ranking: Option<i32>,
    #[serde(alias = "tuition_fee_min")]
    pub tuition_fee_min: Option<i64>,
    #[serde(alias = "tuition_fee_max")]
    pub tuition_fee_max: Option<i64>,
    #[serde(alias = "acceptance_rate")]
    pub acceptance_rate: Option<f64>,
    #[serde(alias = "student_count")]
    pub student_count: Option<i32>,
    pub featured: Option<bool>,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct CountryFacet {
    pub country: String,
    pub count: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UniversitySort {
    #[default]
    Name,
    Ranking,
    Newest,
}

/// Query string for `GET /api/universities`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UniversityQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub min_tuition: Option<i64>,
    pub max_tuition: Option<i64>,
    pub max_ranking: Option<i32>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: UniversitySort,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}
