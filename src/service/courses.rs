//! Course browsing and admin writes.

use crate::error::AppError;
use crate::models::*;
use crate::pagination::{finish_keyed_page, page_limit, parse_cursor, Cursor, Keyed, SORT_KEY};
use crate::sql::{text_after, Direction, KeysetOrder, QueryBuf, SelectBuilder};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const COURSE_COLUMNS: &str = "c.id, c.university_id, c.name, c.level, c.field, c.duration_months, \
     c.tuition_fee, c.language, c.intake, c.description, c.created_at, c.updated_at";

pub fn list_query(query: &CourseQuery) -> Result<(QueryBuf, i64), AppError> {
    let limit = page_limit(query.limit);
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let after = text_after(cursor.as_ref())?;

    let mut b = SelectBuilder::new(format!("SELECT {}, lower(c.name) AS {} FROM courses c", COURSE_COLUMNS, SORT_KEY));
    b.search(&["c.name", "c.field"], query.q.as_deref());
    b.filter_eq("c.university_id", query.university_id);
    if let Some(level) = query.level {
        b.and_where_param("c.level = ?::course_level", level_str(level));
    }
    if let Some(field) = query.field.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        b.and_where_param("lower(c.field) = lower(?)", field);
    }
    if let Some(max) = query.max_tuition {
        b.and_where_param("c.tuition_fee <= ?", max);
    }
    if let Some(max) = query.max_duration {
        b.and_where_param("c.duration_months <= ?", max);
    }
    let order = KeysetOrder::new("lower(c.name)", "text", "c.id", Direction::Asc);
    b.keyset(&order, after).limit(limit + 1);
    Ok((b.build(), limit))
}

pub fn level_str(level: CourseLevel) -> &'static str {
    match level {
        CourseLevel::Diploma => "diploma",
        CourseLevel::Bachelor => "bachelor",
        CourseLevel::Master => "master",
        CourseLevel::Phd => "phd",
    }
}

pub struct CourseService;

impl CourseService {
    pub async fn list(pool: &PgPool, query: &CourseQuery) -> Result<(Vec<Course>, Option<String>), AppError> {
        let (q, limit) = list_query(query)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut sql = sqlx::query_as::<_, Keyed<Course>>(&q.sql);
        for p in q.params {
            sql = sql.bind(p);
        }
        let rows = sql.fetch_all(pool).await?;
        Ok(finish_keyed_page(rows, limit, |k| Cursor::new(k.sort_key.clone(), k.row.id)))
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Course, AppError> {
        let sql = format!("SELECT {} FROM courses c WHERE c.id = $1", COURSE_COLUMNS);
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))
    }

    pub async fn create(pool: &PgPool, input: &CourseInput) -> Result<Course, AppError> {
        let sql = format!(
            "INSERT INTO courses AS c (university_id, name, level, field, duration_months, tuition_fee, language, intake, description) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'English'), $8, $9) RETURNING {}",
            COURSE_COLUMNS
        );
        let row = sqlx::query_as::<_, Course>(&sql)
            .bind(input.university_id)
            .bind(input.name.trim())
            .bind(input.level)
            .bind(input.field.trim())
            .bind(input.duration_months)
            .bind(input.tuition_fee)
            .bind(input.language.as_deref())
            .bind(input.intake.as_deref())
            .bind(input.description.as_deref())
            .fetch_one(pool)
            .await
            .map_err(course_write_error)?;
        tracing::info!(course_id = %row.id, university_id = %row.university_id, "course created");
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: Uuid, patch: &CoursePatch) -> Result<Course, AppError> {
        let sql = format!(
            "UPDATE courses AS c SET name = COALESCE($2, name), level = COALESCE($3, level), field = COALESCE($4, field), \
             duration_months = COALESCE($5, duration_months), tuition_fee = COALESCE($6, tuition_fee), \
             language = COALESCE($7, language), intake = COALESCE($8, intake), \
             description = COALESCE($9, description), updated_at = NOW() WHERE c.id = $1 RETURNING {}",
            COURSE_COLUMNS
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.level)
            .bind(patch.field.as_deref().map(str::trim))
            .bind(patch.duration_months)
            .bind(patch.tuition_fee)
            .bind(patch.language.as_deref())
            .bind(patch.intake.as_deref())
            .bind(patch.description.as_deref())
            .fetch_optional(pool)
            .await
            .map_err(course_write_error)?
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let done = sqlx::query("DELETE FROM courses WHERE id = $1").bind(id).execute(pool).await?;
        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("course {}", id)));
        }
        Ok(())
    }
}

fn course_write_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("this university already offers a course with that name and level".into())
        }
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => AppError::field("universityId", "unknown university"),
        other => AppError::Db(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    #[test]
    fn level_filter_casts_to_enum() {
        let query = CourseQuery {
            level: Some(CourseLevel::Master),
            university_id: Some(Uuid::nil()),
            ..Default::default()
        };
        let (q, _) = list_query(&query).unwrap();
        assert!(q.sql.contains("c.university_id = $1"));
        assert!(q.sql.contains("c.level = $2::course_level"));
        assert_eq!(q.params[1], PgBindValue::from("master"));
    }

    #[test]
    fn listing_selects_the_sort_key_it_orders_by() {
        let (q, _) = list_query(&CourseQuery::default()).unwrap();
        assert!(q.sql.contains(", lower(c.name) AS sort_key FROM courses c"));
        assert!(q.sql.ends_with("ORDER BY lower(c.name) ASC, c.id ASC LIMIT 21"));
    }

    #[test]
    fn duration_and_fee_caps_are_applied() {
        let query = CourseQuery {
            max_tuition: Some(9_000),
            max_duration: Some(24),
            limit: Some(10),
            ..Default::default()
        };
        let (q, limit) = list_query(&query).unwrap();
        assert_eq!(limit, 10);
        assert!(q.sql.contains("c.tuition_fee <= $1 AND c.duration_months <= $2"));
        assert!(q.sql.ends_with("LIMIT 11"));
    }

    #[test]
    fn level_names_match_the_database_enum() {
        assert_eq!(level_str(CourseLevel::Phd), "phd");
        assert_eq!(level_str(CourseLevel::Bachelor), "bachelor");
    }
}
