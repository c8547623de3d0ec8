//! Study applications: submission by students, review by admins.

use crate::error::AppError;
use crate::models::*;
use crate::pagination::{finish_page, page_limit, parse_cursor, Cursor};
use crate::sql::{text_after, Direction, KeysetOrder, QueryBuf, SelectBuilder};
use sqlx::PgPool;
use uuid::Uuid;

const APPLICATION_COLUMNS: &str = "a.id, a.user_id, a.university_id, a.course_id, a.status, a.statement, \
     a.document_urls, a.admin_note, a.created_at, a.updated_at";

/// Who is asking: students are confined to their own rows.
#[derive(Clone, Copy, Debug)]
pub struct Viewer {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub fn list_query(viewer: Viewer, query: &ApplicationQuery) -> Result<(QueryBuf, i64), AppError> {
    let limit = page_limit(query.limit);
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let after = text_after(cursor.as_ref())?;

    let mut b = SelectBuilder::new(format!("SELECT {} FROM applications a", APPLICATION_COLUMNS));
    if viewer.is_admin {
        b.filter_eq("a.user_id", query.user_id);
    } else {
        b.and_where_param("a.user_id = ?", viewer.user_id);
    }
    if let Some(status) = query.status {
        b.and_where_param("a.status = ?::application_status", status.as_str());
    }
    b.filter_eq("a.university_id", query.university_id);
    let order = KeysetOrder::new("a.created_at", "timestamptz", "a.id", Direction::Desc);
    b.keyset(&order, after).limit(limit + 1);
    Ok((b.build(), limit))
}

pub struct ApplicationService;

impl ApplicationService {
    pub async fn submit(pool: &PgPool, user_id: Uuid, input: &ApplicationInput) -> Result<Application, AppError> {
        if let Some(course_id) = input.course_id {
            let owner: Option<Uuid> = sqlx::query_scalar("SELECT university_id FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(pool)
                .await?;
            match owner {
                None => return Err(AppError::field("courseId", "unknown course")),
                Some(u) if u != input.university_id => {
                    return Err(AppError::field("courseId", "course is not offered by this university"))
                }
                Some(_) => {}
            }
        }
        let sql = format!(
            "INSERT INTO applications AS a (user_id, university_id, course_id, statement, document_urls) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(user_id)
            .bind(input.university_id)
            .bind(input.course_id)
            .bind(input.statement.trim())
            .bind(&input.document_urls)
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("an open application for this programme already exists".into())
                }
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    AppError::field("universityId", "unknown university")
                }
                other => AppError::Db(other),
            })?;
        tracing::info!(application_id = %row.id, user_id = %user_id, "application submitted");
        Ok(row)
    }

    pub async fn list(pool: &PgPool, viewer: Viewer, query: &ApplicationQuery) -> Result<(Vec<Application>, Option<String>), AppError> {
        let (q, limit) = list_query(viewer, query)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut sql = sqlx::query_as::<_, Application>(&q.sql);
        for p in q.params {
            sql = sql.bind(p);
        }
        let rows = sql.fetch_all(pool).await?;
        Ok(finish_page(rows, limit, |a| Cursor::new(a.created_at.to_rfc3339(), a.id)))
    }

    /// Another student's application is reported as missing, not forbidden.
    pub async fn get(pool: &PgPool, viewer: Viewer, id: Uuid) -> Result<Application, AppError> {
        let sql = format!("SELECT {} FROM applications a WHERE a.id = $1", APPLICATION_COLUMNS);
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .filter(|a| viewer.is_admin || a.user_id == viewer.user_id);
        row.ok_or_else(|| AppError::NotFound(format!("application {}", id)))
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, update: &StatusUpdate) -> Result<Application, AppError> {
        let mut tx = pool.begin().await?;
        let current: Option<ApplicationStatus> =
            sqlx::query_scalar("SELECT status FROM applications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| AppError::NotFound(format!("application {}", id)))?;
        if !current.can_transition_to(update.status) {
            return Err(AppError::Conflict(format!(
                "cannot move application from {} to {}",
                current.as_str(),
                update.status.as_str()
            )));
        }
        let sql = format!(
            "UPDATE applications AS a SET status = $2, admin_note = COALESCE($3, admin_note), updated_at = NOW() \
             WHERE a.id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(update.status)
            .bind(update.admin_note.as_deref())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(application_id = %id, from = current.as_str(), to = update.status.as_str(), "application status changed");
        Ok(row)
    }

    /// Applicant withdraws; the row is kept with status `withdrawn`.
    pub async fn withdraw(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Application, AppError> {
        let mut tx = pool.begin().await?;
        let found: Option<(Uuid, ApplicationStatus)> =
            sqlx::query_as("SELECT user_id, status FROM applications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = match found {
            Some((owner, status)) if owner == user_id => status,
            _ => return Err(AppError::NotFound(format!("application {}", id))),
        };
        if !status.is_withdrawable() {
            return Err(AppError::Conflict(format!("cannot withdraw a {} application", status.as_str())));
        }
        let sql = format!(
            "UPDATE applications AS a SET status = 'withdrawn', updated_at = NOW() WHERE a.id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql).bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(application_id = %id, "application withdrawn");
        Ok(row)
    }

    /// Counts per status for the admin dashboard.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<(ApplicationStatus, i64)>, AppError> {
        Ok(sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status ORDER BY status")
            .fetch_all(pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    fn student() -> Viewer {
        Viewer {
            user_id: Uuid::new_v4(),
            is_admin: false,
        }
    }

    #[test]
    fn students_only_see_their_own_rows() {
        let viewer = student();
        let query = ApplicationQuery {
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let (q, _) = list_query(viewer, &query).unwrap();
        assert!(q.sql.contains("a.user_id = $1"));
        assert_eq!(q.params[0], PgBindValue::Uuid(viewer.user_id));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn admins_filter_by_anyone_and_status() {
        let admin = Viewer {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };
        let target = Uuid::new_v4();
        let query = ApplicationQuery {
            user_id: Some(target),
            status: Some(ApplicationStatus::UnderReview),
            ..Default::default()
        };
        let (q, _) = list_query(admin, &query).unwrap();
        assert_eq!(q.params[0], PgBindValue::Uuid(target));
        assert!(q.sql.contains("a.status = $2::application_status"));
        assert_eq!(q.params[1], PgBindValue::from("under_review"));
        assert!(q.sql.contains("ORDER BY a.created_at DESC, a.id DESC"));
    }

    #[test]
    fn admin_without_filters_sees_everything() {
        let admin = Viewer {
            user_id: Uuid::nil(),
            is_admin: true,
        };
        let (q, _) = list_query(admin, &ApplicationQuery::default()).unwrap();
        assert!(!q.sql.contains("WHERE"));
    }
}
