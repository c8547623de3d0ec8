//! Bulk catalog import records and admin statistics.

use super::course::{CourseInput, CourseLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// A course row in `courses.json`; the university is named by slug.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseImport {
    #[serde(alias = "university_slug")]
    pub university_slug: String,
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

impl CourseImport {
    pub fn to_input(&self, university_id: Uuid) -> CourseInput {
        CourseInput {
            university_id,
            name: self.name.clone(),
            level: self.level,
            field: self.field.clone(),
            duration_months: self.duration_months,
            tuition_fee: self.tuition_fee,
            language: self.language.clone(),
            intake: self.intake.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub universities: u64,
    pub courses: u64,
    pub faqs: u64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub users: i64,
    pub universities: i64,
    pub courses: i64,
    /// Application counts keyed by status.
    pub applications: BTreeMap<String, i64>,
}
