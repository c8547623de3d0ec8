//! Request validation. Collects every field problem before failing so clients can show
//! all messages at once.

use crate::error::{AppError, FieldErrors};
use crate::models::*;
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("static regex"))
}

/// Accumulates field errors.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    /// Character length (not bytes) within `min..=max`, after trimming.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let n = value.trim().chars().count();
        if n < min {
            if min == 1 {
                self.add(field, "is required");
            } else {
                self.add(field, format!("must be at least {} characters", min));
            }
        } else if n > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }

    pub fn opt_length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(v) = value {
            self.length(field, v, min, max);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !email_re().is_match(value.trim()) {
            self.add(field, "must be a valid email");
        }
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !(v.starts_with("https://") || v.starts_with("http://") || v.starts_with('/')) || v.contains(char::is_whitespace) {
                self.add(field, "must be an http(s) URL");
            }
        }
    }

    pub fn slug(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !slug_re().is_match(v) {
                self.add(field, "must contain only lowercase letters, digits and single hyphens");
            }
        }
    }

    pub fn range_f64(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(v) = value {
            if !(min..=max).contains(&v) {
                self.add(field, format!("must be between {} and {}", min, max));
            }
        }
    }

    pub fn at_least(&mut self, field: &str, value: Option<i64>, min: i64) {
        if let Some(v) = value {
            if v < min {
                self.add(field, format!("must be at least {}", min));
            }
        }
    }

    pub fn password(&mut self, field: &str, value: &str) {
        if value.chars().count() < 8 {
            self.add(field, "must be at least 8 characters");
        } else if value.chars().count() > 128 {
            self.add(field, "must be at most 128 characters");
        }
        if !value.chars().any(|c| c.is_alphabetic()) || !value.chars().any(|c| c.is_ascii_digit()) {
            self.add(field, "must contain a letter and a digit");
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Request bodies that check their own shape before any database work.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

fn check_interests(v: &mut Validator, interests: &[String]) {
    if interests.len() > 20 {
        v.add("interests", "at most 20 entries");
    }
    if interests.iter().any(|i| i.trim().is_empty() || i.chars().count() > 50) {
        v.add("interests", "entries must be 1 to 50 characters");
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 1, 100);
        v.email("email", &self.email);
        v.password("password", &self.password);
        v.opt_length("country", self.country.as_deref(), 2, 100);
        check_interests(&mut v, &self.interests);
        v.finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.email("email", &self.email);
        v.length("password", &self.password, 1, 128);
        v.finish()
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.opt_length("name", self.name.as_deref(), 1, 100);
        v.opt_length("country", self.country.as_deref(), 2, 100);
        v.opt_length("bio", self.bio.as_deref(), 0, 1000);
        v.url("avatarUrl", self.avatar_url.as_deref());
        if let Some(i) = &self.interests {
            check_interests(&mut v, i);
        }
        v.finish()
    }
}

fn check_fees(v: &mut Validator, min: Option<i64>, max: Option<i64>) {
    v.at_least("tuitionFeeMin", min, 0);
    v.at_least("tuitionFeeMax", max, 0);
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            v.add("tuitionFeeMin", "must not exceed tuitionFeeMax");
        }
    }
}

impl Validate for UniversityInput {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 2, 200);
        v.slug("slug", self.slug.as_deref());
        v.length("country", &self.country, 1, 100);
        v.opt_length("city", self.city.as_deref(), 1, 100);
        v.url("website", self.website.as_deref());
        v.url("logoUrl", self.logo_url.as_deref());
        v.at_least("worldRanking", self.world_ranking.map(i64::from), 1);
        v.range_f64("acceptanceRate", self.acceptance_rate, 0.0, 100.0);
        v.at_least("studentCount", self.student_count.map(i64::from), 0);
        check_fees(&mut v, self.tuition_fee_min, self.tuition_fee_max);
        v.finish()
    }
}

impl Validate for UniversityPatch {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.opt_length("name", self.name.as_deref(), 2, 200);
        v.slug("slug", self.slug.as_deref());
        v.opt_length("country", self.country.as_deref(), 1, 100);
        v.opt_length("city", self.city.as_deref(), 1, 100);
        v.url("website", self.website.as_deref());
        v.url("logoUrl", self.logo_url.as_deref());
        v.at_least("worldRanking", self.world_ranking.map(i64::from), 1);
        v.range_f64("acceptanceRate", self.acceptance_rate, 0.0, 100.0);
        v.at_least("studentCount", self.student_count.map(i64::from), 0);
        // Cross-field fee ordering against stored values is enforced by the table CHECK.
        check_fees(&mut v, self.tuition_fee_min, self.tuition_fee_max);
        v.finish()
    }
}

impl Validate for OutcomeInput {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.range_f64("employmentRate", Some(self.employment_rate), 0.0, 100.0);
        v.at_least("medianSalary", self.median_salary, 0);
        if !(1900..=2100).contains(&self.year) {
            v.add("year", "must be between 1900 and 2100");
        }
        if self.top_employers.len() > 20 {
            v.add("topEmployers", "at most 20 entries");
        }
        v.finish()
    }
}

impl Validate for CourseInput {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 2, 200);
        v.length("field", &self.field, 1, 100);
        v.at_least("durationMonths", Some(self.duration_months.into()), 1);
        v.at_least("tuitionFee", self.tuition_fee, 0);
        v.opt_length("language", self.language.as_deref(), 1, 50);
        v.opt_length("intake", self.intake.as_deref(), 1, 100);
        v.finish()
    }
}

impl Validate for CoursePatch {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.opt_length("name", self.name.as_deref(), 2, 200);
        v.opt_length("field", self.field.as_deref(), 1, 100);
        v.at_least("durationMonths", self.duration_months.map(i64::from), 1);
        v.at_least("tuitionFee", self.tuition_fee, 0);
        v.opt_length("language", self.language.as_deref(), 1, 50);
        v.opt_length("intake", self.intake.as_deref(), 1, 100);
        v.finish()
    }
}

impl Validate for FaqInput {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("question", &self.question, 5, 500);
        v.length("answer", &self.answer, 1, 5000);
        v.opt_length("category", self.category.as_deref(), 1, 50);
        v.finish()
    }
}

impl Validate for FaqPatch {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.opt_length("question", self.question.as_deref(), 5, 500);
        v.opt_length("answer", self.answer.as_deref(), 1, 5000);
        v.opt_length("category", self.category.as_deref(), 1, 50);
        v.finish()
    }
}

pub const MAX_DOCUMENTS: usize = 10;

impl Validate for ApplicationInput {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("statement", &self.statement, 50, 5000);
        if self.document_urls.len() > MAX_DOCUMENTS {
            v.add("documentUrls", format!("at most {} documents", MAX_DOCUMENTS));
        }
        for url in &self.document_urls {
            v.url("documentUrls", Some(url));
        }
        v.finish()
    }
}

impl Validate for StatusUpdate {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.opt_length("adminNote", self.admin_note.as_deref(), 0, 2000);
        v.finish()
    }
}

impl Validate for WishlistAdd {
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }
}

impl Validate for QuizAnswers {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        let field_blank = self.field.as_deref().map(|f| f.trim().is_empty()).unwrap_or(true);
        if self.countries.is_empty() && self.max_budget.is_none() && self.level.is_none() && field_blank {
            v.add("answers", "answer at least one question");
        }
        if self.countries.len() > 20 {
            v.add("countries", "at most 20 entries");
        }
        v.at_least("maxBudget", self.max_budget, 0);
        v.finish()
    }
}
