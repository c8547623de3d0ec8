//! University catalog: filtered listing, detail, admin writes, career outcomes.

use crate::error::AppError;
use crate::models::*;
use crate::pagination::{finish_keyed_page, page_limit, parse_cursor, Cursor, Keyed, SORT_KEY};
use crate::sql::{int_after, text_after, Direction, KeysetOrder, QueryBuf, SelectBuilder};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const UNIVERSITY_COLUMNS: &str = "u.id, u.slug, u.name, u.country, u.city, u.description, u.website, \
     u.logo_url, u.world_ranking, u.tuition_fee_min, u.tuition_fee_max, u.acceptance_rate, u.student_count, \
     u.featured, u.created_at, u.updated_at";

/// Unranked universities sort after every ranked one.
const RANK_KEY: &str = "COALESCE(u.world_ranking, 2147483647)";

/// Derive a URL slug: lowercase ASCII alphanumerics joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        let c = match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

fn keyset_for(sort: UniversitySort) -> KeysetOrder {
    match sort {
        UniversitySort::Name => KeysetOrder::new("lower(u.name)", "text", "u.id", Direction::Asc),
        UniversitySort::Ranking => KeysetOrder::new(RANK_KEY, "int8", "u.id", Direction::Asc),
        UniversitySort::Newest => KeysetOrder::new("u.created_at", "timestamptz", "u.id", Direction::Desc),
    }
}

fn cursor_for(sort: UniversitySort, k: &Keyed<University>) -> Cursor {
    let u = &k.row;
    match sort {
        UniversitySort::Name => Cursor::new(k.sort_key.clone(), u.id),
        UniversitySort::Ranking => Cursor::new(i64::from(u.world_ranking.unwrap_or(i32::MAX)), u.id),
        UniversitySort::Newest => Cursor::new(u.created_at.to_rfc3339(), u.id),
    }
}

/// Build the listing query. Pure so the SQL can be checked without a database.
pub fn list_query(query: &UniversityQuery) -> Result<(QueryBuf, i64), AppError> {
    if let (Some(lo), Some(hi)) = (query.min_tuition, query.max_tuition) {
        if lo > hi {
            return Err(AppError::BadRequest("min_tuition must not exceed max_tuition".into()));
        }
    }
    let limit = page_limit(query.limit);
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let after = match query.sort {
        UniversitySort::Ranking => int_after(cursor.as_ref())?,
        UniversitySort::Name | UniversitySort::Newest => text_after(cursor.as_ref())?,
    };

    let mut b = SelectBuilder::new(format!(
        "SELECT {}, lower(u.name) AS {} FROM universities u",
        UNIVERSITY_COLUMNS, SORT_KEY
    ));
    b.search(&["u.name", "u.city", "u.country"], query.q.as_deref());
    if let Some(country) = query.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        b.and_where_param("lower(u.country) = lower(?)", country);
    }
    if let Some(city) = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        b.and_where_param("lower(u.city) = lower(?)", city);
    }
    // Fee filters keep universities whose published range overlaps the requested one.
    if let Some(lo) = query.min_tuition {
        b.and_where_param("COALESCE(u.tuition_fee_max, u.tuition_fee_min) >= ?", lo);
    }
    if let Some(hi) = query.max_tuition {
        b.and_where_param("COALESCE(u.tuition_fee_min, u.tuition_fee_max) <= ?", hi);
    }
    if let Some(rank) = query.max_ranking {
        b.and_where_param("u.world_ranking <= ?", rank);
    }
    b.filter_eq("u.featured", query.featured);
    b.keyset(&keyset_for(query.sort), after).limit(limit + 1);
    Ok((b.build(), limit))
}

pub(crate) async fn fetch_universities(pool: &PgPool, q: QueryBuf) -> Result<Vec<University>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, University>(&q.sql);
    for p in q.params {
        query = query.bind(p);
    }
    Ok(query.fetch_all(pool).await?)
}

pub struct UniversityService;

impl UniversityService {
    pub async fn list(pool: &PgPool, query: &UniversityQuery) -> Result<(Vec<University>, Option<String>), AppError> {
        let (q, limit) = list_query(query)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut sql = sqlx::query_as::<_, Keyed<University>>(&q.sql);
        for p in q.params {
            sql = sql.bind(p);
        }
        let rows = sql.fetch_all(pool).await?;
        let sort = query.sort;
        Ok(finish_keyed_page(rows, limit, |k| cursor_for(sort, k)))
    }

    /// Look up by uuid, falling back to slug.
    pub async fn find(pool: &PgPool, id_or_slug: &str) -> Result<University, AppError> {
        let mut b = SelectBuilder::new(format!("SELECT {} FROM universities u", UNIVERSITY_COLUMNS));
        match Uuid::parse_str(id_or_slug) {
            Ok(id) => b.and_where_param("u.id = ?", id),
            Err(_) => b.and_where_param("u.slug = ?", id_or_slug.to_lowercase()),
        };
        fetch_universities(pool, b.build())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("university {}", id_or_slug)))
    }

    pub async fn detail(pool: &PgPool, id_or_slug: &str) -> Result<UniversityDetail, AppError> {
        let university = Self::find(pool, id_or_slug).await?;
        let course_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE university_id = $1")
            .bind(university.id)
            .fetch_one(pool)
            .await?;
        let outcomes = Self::outcomes(pool, university.id).await?;
        Ok(UniversityDetail {
            university,
            course_count,
            outcomes,
        })
    }

    pub async fn create(pool: &PgPool, input: &UniversityInput) -> Result<University, AppError> {
        let slug = input.slug.clone().unwrap_or_else(|| slugify(&input.name));
        if slug.is_empty() {
            return Err(AppError::field("slug", "could not derive a slug from name"));
        }
        let sql = format!(
            "INSERT INTO universities AS u (slug, name, country, city, description, website, logo_url, world_ranking, \
             tuition_fee_min, tuition_fee_max, acceptance_rate, student_count, featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
            UNIVERSITY_COLUMNS
        );
        let row = sqlx::query_as::<_, University>(&sql)
            .bind(&slug)
            .bind(input.name.trim())
            .bind(input.country.trim())
            .bind(input.city.as_deref())
            .bind(input.description.as_deref())
            .bind(input.website.as_deref())
            .bind(input.logo_url.as_deref())
            .bind(input.world_ranking)
            .bind(input.tuition_fee_min)
            .bind(input.tuition_fee_max)
            .bind(input.acceptance_rate)
            .bind(input.student_count)
            .bind(input.featured)
            .fetch_one(pool)
            .await
            .map_err(|e| slug_conflict(e, &slug))?;
        tracing::info!(university_id = %row.id, slug = %row.slug, "university created");
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: Uuid, patch: &UniversityPatch) -> Result<University, AppError> {
        let sql = format!(
            "UPDATE universities AS u SET slug = COALESCE($2, slug), name = COALESCE($3, name), \
             country = COALESCE($4, country), city = COALESCE($5, city), description = COALESCE($6, description), \
             website = COALESCE($7, website), logo_url = COALESCE($8, logo_url), \
             world_ranking = COALESCE($9, world_ranking), tuition_fee_min = COALESCE($10, tuition_fee_min), \
             tuition_fee_max = COALESCE($11, tuition_fee_max), acceptance_rate = COALESCE($12, acceptance_rate), \
             student_count = COALESCE($13, student_count), featured = COALESCE($14, featured), updated_at = NOW() \
             WHERE u.id = $1 RETURNING {}",
            UNIVERSITY_COLUMNS
        );
        let slug = patch.slug.clone().unwrap_or_default();
        sqlx::query_as::<_, University>(&sql)
            .bind(id)
            .bind(patch.slug.as_deref())
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.country.as_deref().map(str::trim))
            .bind(patch.city.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.website.as_deref())
            .bind(patch.logo_url.as_deref())
            .bind(patch.world_ranking)
            .bind(patch.tuition_fee_min)
            .bind(patch.tuition_fee_max)
            .bind(patch.acceptance_rate)
            .bind(patch.student_count)
            .bind(patch.featured)
            .fetch_optional(pool)
            .await
            .map_err(|e| check_violation(slug_conflict(e, &slug)))?
            .ok_or_else(|| AppError::NotFound(format!("university {}", id)))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let done = sqlx::query("DELETE FROM universities WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("university {}", id)));
        }
        tracing::info!(university_id = %id, "university deleted");
        Ok(())
    }

    /// Distinct countries with university counts, most populated first.
    pub async fn countries(pool: &PgPool) -> Result<Vec<CountryFacet>, AppError> {
        Ok(sqlx::query_as::<_, CountryFacet>(
            "SELECT country, COUNT(*) AS count FROM universities GROUP BY country ORDER BY count DESC, country",
        )
        .fetch_all(pool)
        .await?)
    }

    pub async fn outcomes(pool: &PgPool, university_id: Uuid) -> Result<Vec<CareerOutcome>, AppError> {
        Ok(sqlx::query_as::<_, CareerOutcome>(
            "SELECT id, university_id, employment_rate, median_salary, top_employers, year \
             FROM career_outcomes WHERE university_id = $1 ORDER BY year DESC",
        )
        .bind(university_id)
        .fetch_all(pool)
        .await?)
    }

    /// Insert or replace the outcome for `(university, year)`.
    pub async fn upsert_outcome(pool: &PgPool, university_id: Uuid, input: &OutcomeInput) -> Result<CareerOutcome, AppError> {
        Self::find(pool, &university_id.to_string()).await?;
        Ok(sqlx::query_as::<_, CareerOutcome>(
            "INSERT INTO career_outcomes (university_id, employment_rate, median_salary, top_employers, year) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (university_id, year) DO UPDATE SET employment_rate = EXCLUDED.employment_rate, \
             median_salary = EXCLUDED.median_salary, top_employers = EXCLUDED.top_employers \
             RETURNING id, university_id, employment_rate, median_salary, top_employers, year",
        )
        .bind(university_id)
        .bind(input.employment_rate)
        .bind(input.median_salary)
        .bind(&input.top_employers)
        .bind(input.year)
        .fetch_one(pool)
        .await?)
    }

    pub async fn delete_outcome(pool: &PgPool, outcome_id: Uuid) -> Result<(), AppError> {
        let done = sqlx::query("DELETE FROM career_outcomes WHERE id = $1")
            .bind(outcome_id)
            .execute(pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("outcome {}", outcome_id)));
        }
        Ok(())
    }
}

fn slug_conflict(e: sqlx::Error, slug: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict(format!("slug '{}' is already taken", slug))
        }
        other => AppError::Db(other),
    }
}

/// Table CHECK failures on partial updates (e.g. fee range against stored values) are client errors.
fn check_violation(e: AppError) -> AppError {
    match e {
        AppError::Db(sqlx::Error::Database(ref db)) if db.is_check_violation() => {
            AppError::BadRequest(format!("update violates constraint {}", db.constraint().unwrap_or("check")))
        }
        other => other,
    }
}
