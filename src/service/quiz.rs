//! Quiz-driven university recommendations.

use crate::error::AppError;
use crate::models::{CourseLevel, QuizAnswers, Recommendation, University};
use crate::service::courses::level_str;
use crate::service::universities::UNIVERSITY_COLUMNS;
use sqlx::{FromRow, PgPool};

pub const DEFAULT_RECOMMENDATIONS: i64 = 10;
const TOP_RANK: i32 = 200;

/// A university with the levels and fields of the courses it offers.
#[derive(Clone, Debug, FromRow)]
pub struct Candidate {
    #[sqlx(flatten)]
    pub university: University,
    pub levels: Vec<String>,
    pub fields: Vec<String>,
}

/// Score one candidate. Returns 0 with no reasons when nothing matches.
pub fn score(answers: &QuizAnswers, c: &Candidate) -> (i64, Vec<String>) {
    let mut total = 0;
    let mut reasons = Vec::new();
    let u = &c.university;

    if answers.countries.iter().any(|wanted| wanted.trim().eq_ignore_ascii_case(&u.country)) {
        total += 3;
        reasons.push(format!("located in {}", u.country));
    }
    if let (Some(budget), Some(min_fee)) = (answers.max_budget, u.tuition_fee_min) {
        if min_fee <= budget {
            total += 3;
            reasons.push("tuition fits your budget".to_string());
        }
    }
    if let Some(level) = answers.level {
        if c.levels.iter().any(|l| l == level_str(level)) {
            total += 2;
            reasons.push(format!("offers {} programmes", level_label(level)));
        }
    }
    if let Some(field) = answers.field.as_deref().map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty()) {
        if c.fields.iter().any(|f| f.to_lowercase().contains(&field)) {
            total += 2;
            reasons.push(format!("teaches {}", field));
        }
    }
    if answers.prefer_ranked && u.world_ranking.map(|r| r <= TOP_RANK).unwrap_or(false) {
        total += 1;
        reasons.push(format!("ranked in the world top {}", TOP_RANK));
    }
    (total, reasons)
}

fn level_label(level: CourseLevel) -> &'static str {
    match level {
        CourseLevel::Diploma => "diploma",
        CourseLevel::Bachelor => "bachelor's",
        CourseLevel::Master => "master's",
        CourseLevel::Phd => "doctoral",
    }
}

/// Score, drop zeros, order by score then name, truncate.
pub fn rank(answers: &QuizAnswers, candidates: Vec<Candidate>) -> Vec<Recommendation> {
    let limit = answers.limit.unwrap_or(DEFAULT_RECOMMENDATIONS).clamp(1, 100) as usize;
    let mut out: Vec<Recommendation> = candidates
        .into_iter()
        .filter_map(|c| {
            let (score, reasons) = score(answers, &c);
            (score > 0).then_some(Recommendation {
                university: c.university,
                score,
                reasons,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.university.name.to_lowercase().cmp(&b.university.name.to_lowercase()))
            .then_with(|| a.university.id.cmp(&b.university.id))
    });
    out.truncate(limit);
    out
}

pub struct QuizService;

impl QuizService {
    pub async fn recommend(pool: &PgPool, answers: &QuizAnswers) -> Result<Vec<Recommendation>, AppError> {
        let sql = format!(
            "SELECT {}, \
               COALESCE(ARRAY(SELECT DISTINCT c.level::text FROM courses c WHERE c.university_id = u.id), '{{}}') AS levels, \
               COALESCE(ARRAY(SELECT DISTINCT c.field FROM courses c WHERE c.university_id = u.id), '{{}}') AS fields \
             FROM universities u",
            UNIVERSITY_COLUMNS
        );
        let candidates = sqlx::query_as::<_, Candidate>(&sql).fetch_all(pool).await?;
        let ranked = rank(answers, candidates);
        tracing::debug!(matches = ranked.len(), "quiz recommendations");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(name: &str, country: &str, min_fee: Option<i64>, rank: Option<i32>, levels: &[&str], fields: &[&str]) -> Candidate {
        Candidate {
            university: University {
                id: Uuid::new_v4(),
                slug: name.to_lowercase().replace(' ', "-"),
                name: name.into(),
                country: country.into(),
                city: None,
                description: None,
                website: None,
                logo_url: None,
                world_ranking: rank,
                tuition_fee_min: min_fee,
                tuition_fee_max: None,
                acceptance_rate: None,
                student_count: None,
                featured: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            levels: levels.iter().map(|s| s.to_string()).collect(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn every_criterion_contributes() {
        let answers = QuizAnswers {
            countries: vec!["germany".into()],
            max_budget: Some(10_000),
            level: Some(CourseLevel::Master),
            field: Some("Computer".into()),
            prefer_ranked: true,
            limit: None,
        };
        let c = candidate("TU Munich", "Germany", Some(0), Some(37), &["master"], &["Computer Science"]);
        let (total, reasons) = score(&answers, &c);
        assert_eq!(total, 11);
        assert_eq!(reasons.len(), 5);
    }

    #[test]
    fn missing_fee_never_fits_a_budget() {
        let answers = QuizAnswers {
            max_budget: Some(50_000),
            ..Default::default()
        };
        let c = candidate("Somewhere", "Chile", None, None, &[], &[]);
        assert_eq!(score(&answers, &c).0, 0);
    }

    #[test]
    fn ranking_bonus_needs_the_preference() {
        let c = candidate("Oxford", "United Kingdom", Some(30_000), Some(3), &["bachelor"], &["Law"]);
        let plain = QuizAnswers {
            countries: vec!["United Kingdom".into()],
            ..Default::default()
        };
        assert_eq!(score(&plain, &c).0, 3);
        let ranked = QuizAnswers {
            prefer_ranked: true,
            ..plain
        };
        assert_eq!(score(&ranked, &c).0, 4);
    }

    #[test]
    fn rank_drops_zeros_and_orders_by_score() {
        let answers = QuizAnswers {
            countries: vec!["Canada".into()],
            level: Some(CourseLevel::Bachelor),
            limit: Some(2),
            ..Default::default()
        };
        let out = rank(
            &answers,
            vec![
                candidate("Zeta", "Canada", None, None, &[], &[]),
                candidate("Alpha", "Canada", None, None, &["bachelor"], &[]),
                candidate("Beta", "Canada", None, None, &[], &[]),
                candidate("Nowhere", "Peru", None, None, &[], &[]),
            ],
        );
        let names: Vec<_> = out.iter().map(|r| r.university.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
        assert_eq!(out[0].score, 5);
    }
}
