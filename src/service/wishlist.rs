use crate::error::AppError;
use crate::models::WishlistItem;
use crate::service::universities::UNIVERSITY_COLUMNS;
use sqlx::PgPool;
use uuid::Uuid;

pub struct WishlistService;

impl WishlistService {
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<WishlistItem>, AppError> {
        let sql = format!(
            "SELECT {}, w.created_at AS saved_at FROM wishlist w JOIN universities u ON u.id = w.university_id \
             WHERE w.user_id = $1 ORDER BY w.created_at DESC, u.id",
            UNIVERSITY_COLUMNS
        );
        Ok(sqlx::query_as::<_, WishlistItem>(&sql).bind(user_id).fetch_all(pool).await?)
    }

    /// Returns true when a new entry was stored, false when it was already saved.
    pub async fn add(pool: &PgPool, user_id: Uuid, university_id: Uuid) -> Result<bool, AppError> {
        let done = sqlx::query(
            "INSERT INTO wishlist (user_id, university_id) VALUES ($1, $2) ON CONFLICT (user_id, university_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(university_id)
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound(format!("university {}", university_id))
            }
            other => AppError::Db(other),
        })?;
        Ok(done.rows_affected() == 1)
    }

    pub async fn remove(pool: &PgPool, user_id: Uuid, university_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND university_id = $2")
            .bind(user_id)
            .bind(university_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
