/// Frequently asked questions

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
}

impl Faq {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Faq>(
            "SELECT id, question, answer, category FROM faqs ORDER BY category, created_at",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        question: &str,
        answer: &str,
        category: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Faq>(
            r#"
            INSERT INTO faqs (question, answer, category)
            VALUES ($1, $2, $3)
            RETURNING id, question, answer, category
            "#,
        )
        .bind(question)
        .bind(answer)
        .bind(category)
        .fetch_one(pool)
        .await
    }

    /// Replaces the text of an existing entry
    ///
    /// # Returns
    ///
    /// The updated entry, or `None` if it does not exist
    pub async fn update(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Faq>(
            r#"
            UPDATE faqs
            SET question = $2, answer = $3, category = $4
            WHERE id = $1
            RETURNING id, question, answer, category
            "#,
        )
        .bind(self.id)
        .bind(&self.question)
        .bind(&self.answer)
        .bind(&self.category)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
