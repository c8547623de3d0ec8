//! Peer suggestions and follows.
//!
//! Suggestions rank other students by affinity with the caller:
//! shared interests weigh most, then universities both have saved, then a shared country.

use crate::error::AppError;
use crate::models::{PageQuery, PublicProfile, Suggestion};
use crate::pagination::{finish_page, page_limit, parse_cursor, Cursor};
use crate::sql::{int_after, Direction, KeysetOrder, QueryBuf, SelectBuilder};
use sqlx::PgPool;
use uuid::Uuid;

pub const INTEREST_WEIGHT: i64 = 3;
pub const UNIVERSITY_WEIGHT: i64 = 2;
pub const COUNTRY_WEIGHT: i64 = 1;

fn candidates_sql(me: &str) -> String {
    format!(
        "SELECT * FROM (\
           SELECT s.id, s.name, s.country, s.interests, s.avatar_url, s.bio, s.shared_interests, s.shared_universities, \
             ({iw} * cardinality(s.shared_interests) + {uw} * s.shared_universities \
              + CASE WHEN s.same_country THEN {cw} ELSE 0 END)::int8 AS score \
           FROM (\
             SELECT u.id, u.name, u.country, u.interests, u.avatar_url, u.bio, \
               ARRAY(SELECT DISTINCT i FROM unnest(u.interests) AS i WHERE i = ANY(me.interests) ORDER BY i) AS shared_interests, \
               (SELECT COUNT(*) FROM wishlist w JOIN wishlist mine ON mine.university_id = w.university_id \
                  AND mine.user_id = me.id WHERE w.user_id = u.id) AS shared_universities, \
               COALESCE(lower(u.country) = lower(me.country), FALSE) AS same_country \
             FROM users u CROSS JOIN (SELECT id, country, interests FROM users WHERE id = {me}) me \
             WHERE u.id <> me.id AND u.role = 'student' \
               AND NOT EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = me.id AND f.followee_id = u.id)\
           ) s\
         ) p",
        iw = INTEREST_WEIGHT,
        uw = UNIVERSITY_WEIGHT,
        cw = COUNTRY_WEIGHT,
        me = me,
    )
}

pub fn suggestion_query(user_id: Uuid, page: &PageQuery) -> Result<(QueryBuf, i64), AppError> {
    let limit = page_limit(page.limit);
    let cursor = parse_cursor(page.cursor.as_deref())?;
    let after = int_after(cursor.as_ref())?;

    // The caller's id is always the first placeholder.
    let mut b = SelectBuilder::new(candidates_sql("$1"));
    b.push_param(user_id);
    let order = KeysetOrder::new("p.score", "int8", "p.id", Direction::Desc);
    b.keyset(&order, after).limit(limit + 1);
    let q = b.build();
    Ok((q, limit))
}

pub struct ConnectService;

impl ConnectService {
    pub async fn suggestions(pool: &PgPool, user_id: Uuid, page: &PageQuery) -> Result<(Vec<Suggestion>, Option<String>), AppError> {
        let (q, limit) = suggestion_query(user_id, page)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut sql = sqlx::query_as::<_, Suggestion>(&q.sql);
        for p in q.params {
            sql = sql.bind(p);
        }
        let rows = sql.fetch_all(pool).await?;
        Ok(finish_page(rows, limit, |s| Cursor::new(s.score, s.user.id)))
    }

    pub async fn follow(pool: &PgPool, follower: Uuid, followee: Uuid) -> Result<(), AppError> {
        if follower == followee {
            return Err(AppError::BadRequest("you cannot follow yourself".into()));
        }
        sqlx::query(
            "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) ON CONFLICT (follower_id, followee_id) DO NOTHING",
        )
        .bind(follower)
        .bind(followee)
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound(format!("user {}", followee))
            }
            other => AppError::Db(other),
        })?;
        tracing::debug!(follower = %follower, followee = %followee, "follow");
        Ok(())
    }

    pub async fn unfollow(pool: &PgPool, follower: Uuid, followee: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower)
            .bind(followee)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn following(pool: &PgPool, user_id: Uuid) -> Result<Vec<PublicProfile>, AppError> {
        Ok(sqlx::query_as::<_, PublicProfile>(
            "SELECT u.id, u.name, u.country, u.interests, u.avatar_url, u.bio \
             FROM follows f JOIN users u ON u.id = f.followee_id \
             WHERE f.follower_id = $1 ORDER BY f.created_at DESC, u.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PgBindValue;

    #[test]
    fn score_uses_the_published_weights() {
        let sql = candidates_sql("$1");
        assert!(sql.contains("(3 * cardinality(s.shared_interests) + 2 * s.shared_universities"));
        assert!(sql.contains("THEN 1 ELSE 0"));
    }

    #[test]
    fn only_other_students_are_candidates() {
        let sql = candidates_sql("$1");
        assert!(sql.contains("WHERE u.id <> me.id AND u.role = 'student'"));
        assert!(sql.contains("NOT EXISTS (SELECT 1 FROM follows f"));
    }

    #[test]
    fn first_page_binds_only_the_caller() {
        let me = Uuid::new_v4();
        let (q, limit) = suggestion_query(me, &PageQuery::default()).unwrap();
        assert_eq!(limit, 20);
        assert_eq!(q.params, vec![PgBindValue::Uuid(me)]);
        assert!(q.sql.contains("WHERE id = $1"));
        assert!(q.sql.ends_with("ORDER BY p.score DESC, p.id DESC LIMIT 21"));
    }

    #[test]
    fn cursor_continues_below_the_last_score() {
        let me = Uuid::new_v4();
        let last = Uuid::new_v4();
        let page = PageQuery {
            limit: Some(5),
            cursor: Some(Cursor::new(7i64, last).encode()),
        };
        let (q, _) = suggestion_query(me, &page).unwrap();
        assert!(q.sql.contains("(p.score, p.id) < ($2::int8, $3::uuid)"));
        assert_eq!(q.params[1], PgBindValue::I64(7));
        assert_eq!(q.params[2], PgBindValue::Uuid(last));
    }

    #[test]
    fn text_cursor_is_rejected() {
        let page = PageQuery {
            limit: None,
            cursor: Some(Cursor::new("abc", Uuid::nil()).encode()),
        };
        assert!(matches!(suggestion_query(Uuid::nil(), &page), Err(AppError::BadRequest(_))));
    }
}
