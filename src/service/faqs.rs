use crate::error::AppError;
use crate::models::{Faq, FaqInput, FaqPatch};
use crate::sql::SelectBuilder;
use sqlx::PgPool;
use uuid::Uuid;

const FAQ_COLUMNS: &str = "id, question, answer, category, position, published, created_at, updated_at";

pub struct FaqService;

impl FaqService {
    pub async fn list(pool: &PgPool, category: Option<&str>, include_unpublished: bool) -> Result<Vec<Faq>, AppError> {
        let mut b = SelectBuilder::new(format!("SELECT {} FROM faqs", FAQ_COLUMNS));
        if !include_unpublished {
            b.and_where("published");
        }
        if let Some(c) = category.map(str::trim).filter(|c| !c.is_empty()) {
            b.and_where_param("lower(category) = lower(?)", c);
        }
        b.order_by("position, id");
        let q = b.build();
        let mut query = sqlx::query_as::<_, Faq>(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        Ok(query.fetch_all(pool).await?)
    }

    pub async fn create(pool: &PgPool, input: &FaqInput) -> Result<Faq, AppError> {
        let sql = format!(
            "INSERT INTO faqs (question, answer, category, position, published) \
             VALUES ($1, $2, COALESCE($3, 'general'), COALESCE($4, 0), COALESCE($5, TRUE)) RETURNING {}",
            FAQ_COLUMNS
        );
        Ok(sqlx::query_as::<_, Faq>(&sql)
            .bind(input.question.trim())
            .bind(input.answer.trim())
            .bind(input.category.as_deref().map(str::trim))
            .bind(input.position)
            .bind(input.published)
            .fetch_one(pool)
            .await?)
    }

    pub async fn update(pool: &PgPool, id: Uuid, patch: &FaqPatch) -> Result<Faq, AppError> {
        let sql = format!(
            "UPDATE faqs SET question = COALESCE($2, question), answer = COALESCE($3, answer), \
             category = COALESCE($4, category), position = COALESCE($5, position), \
             published = COALESCE($6, published), updated_at = NOW() WHERE id = $1 RETURNING {}",
            FAQ_COLUMNS
        );
        sqlx::query_as::<_, Faq>(&sql)
            .bind(id)
            .bind(patch.question.as_deref().map(str::trim))
            .bind(patch.answer.as_deref().map(str::trim))
            .bind(patch.category.as_deref().map(str::trim))
            .bind(patch.position)
            .bind(patch.published)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("faq {}", id)))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let done = sqlx::query("DELETE FROM faqs WHERE id = $1").bind(id).execute(pool).await?;
        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("faq {}", id)));
        }
        Ok(())
    }
}
