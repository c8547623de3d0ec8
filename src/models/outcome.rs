use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CareerOutcome {
    pub id: Uuid,
    pub university_id: Uuid,
    pub employment_rate: f64,
    pub median_salary: Option<i64>,
    pub top_employers: Vec<String>,
    pub year: i32,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeInput {
    #[serde(alias = "employment_rate")]
    pub employment_rate: f64,
    #[serde(default, alias = "median_salary")]
    pub median_salary: Option<i64>,
    #[serde(default, alias = "top_employers")]
    pub top_employers: Vec<String>,
    pub year: i32,
}
