/// Commitment catalog
///
/// Static list of habit commitments participants pick from, grouped by
/// category name with a few reference links each. Loaded from
/// `commitments.json` during initialization and read-only afterwards.

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};

/// Reference link shown next to a commitment category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentLink {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,
}

/// Commitment category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Commitment {
    pub name: String,

    #[serde(default)]
    pub links: Json<Vec<CommitmentLink>>,

    #[serde(default)]
    pub commitments: Vec<String>,
}

impl Commitment {
    /// Lists the catalog
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Commitment>(
            "SELECT name, links, commitments FROM commitments ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    /// Replaces the whole catalog
    pub async fn replace_all(pool: &PgPool, catalog: &[Commitment]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM commitments").execute(&mut *tx).await?;

        let mut inserted = 0;
        for commitment in catalog {
            inserted += sqlx::query(
                r#"
                INSERT INTO commitments (name, links, commitments)
                VALUES ($1, $2, $3)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(&commitment.name)
            .bind(&commitment.links)
            .bind(&commitment.commitments)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }
}
