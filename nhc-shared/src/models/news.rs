/// News items shown on the participant dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const NEWS_COLUMNS: &str = "id, subject, body, published, publish_date, admin_only";

/// Announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: Uuid,

    pub subject: String,

    pub body: String,

    pub published: bool,

    /// Set when the item is first published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,

    /// Only visible to administrators
    pub admin_only: bool,
}

/// Input for creating a news item
#[derive(Debug, Clone, Default)]
pub struct CreateNews {
    pub subject: String,
    pub body: String,
    pub published: bool,
    pub admin_only: bool,
}

impl News {
    /// Published items, newest first
    ///
    /// Admin-only items are included when `include_admin_only` is set.
    pub async fn list_published(
        pool: &PgPool,
        include_admin_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {NEWS_COLUMNS}
            FROM news
            WHERE published AND (NOT admin_only OR $1)
            ORDER BY publish_date DESC NULLS LAST, created_at DESC
            "#
        );

        sqlx::query_as::<_, News>(&query)
            .bind(include_admin_only)
            .fetch_all(pool)
            .await
    }

    /// Every item, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {NEWS_COLUMNS} FROM news ORDER BY created_at DESC");

        sqlx::query_as::<_, News>(&query).fetch_all(pool).await
    }

    /// Creates an item, stamping the publish date if it starts published
    pub async fn create(pool: &PgPool, data: CreateNews) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO news (subject, body, published, publish_date, admin_only)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN NOW() END, $4)
            RETURNING {NEWS_COLUMNS}
            "#
        );

        sqlx::query_as::<_, News>(&query)
            .bind(data.subject)
            .bind(data.body)
            .bind(data.published)
            .bind(data.admin_only)
            .fetch_one(pool)
            .await
    }

    /// Deletes an item
    ///
    /// # Returns
    ///
    /// `true` if the item existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Publishes or unpublishes an item
    ///
    /// The publish date is stamped on the first publication and kept after.
    pub async fn set_published(
        pool: &PgPool,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE news
            SET published = $2,
                publish_date = CASE WHEN $2 THEN COALESCE(publish_date, NOW())
                                    ELSE publish_date END
            WHERE id = $1
            RETURNING {NEWS_COLUMNS}
            "#
        );

        sqlx::query_as::<_, News>(&query)
            .bind(id)
            .bind(published)
            .fetch_optional(pool)
            .await
    }
}
