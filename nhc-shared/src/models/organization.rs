/// Organization model and database operations
///
/// Organizations are referenced from users by name, so renaming, deleting
/// and merging cascade to every member. Each cascade runs in one transaction
/// together with the organization change; on error nothing is applied.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL UNIQUE,
///     needs_approval BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::User;

/// Organization that users can belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,

    pub name: String,

    /// Created by a registering user rather than an administrator
    pub needs_approval: bool,
}

impl Organization {
    /// Lists every organization ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, needs_approval FROM organizations ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    /// Finds an organization by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, needs_approval FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an organization by exact name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, needs_approval FROM organizations WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Creates an organization
    ///
    /// # Errors
    ///
    /// Unique violation on `organizations_name_key` if the name is taken
    pub async fn create(
        pool: &PgPool,
        name: &str,
        needs_approval: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, needs_approval)
            VALUES ($1, $2)
            RETURNING id, name, needs_approval
            "#,
        )
        .bind(name)
        .bind(needs_approval)
        .fetch_one(pool)
        .await
    }

    /// Creates an organization unless one with that name exists
    ///
    /// # Returns
    ///
    /// `true` if a new organization was inserted
    pub async fn create_if_absent(
        pool: &PgPool,
        name: &str,
        needs_approval: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO organizations (name, needs_approval)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(needs_approval)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Renames an organization and every member's reference to it
    ///
    /// # Returns
    ///
    /// The renamed organization, or `None` if it does not exist
    pub async fn rename(
        pool: &PgPool,
        id: Uuid,
        new_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, Organization>(
            "SELECT id, name, needs_approval FROM organizations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let renamed = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2
            WHERE id = $1
            RETURNING id, name, needs_approval
            "#,
        )
        .bind(id)
        .bind(new_name)
        .fetch_one(&mut *tx)
        .await?;

        let members =
            User::reassign_organizations(&mut *tx, &[existing.name.clone()], new_name).await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %id,
            old_name = %existing.name,
            new_name = %new_name,
            members,
            "Organization renamed"
        );

        Ok(Some(renamed))
    }

    /// Deletes an organization and unsets it on every member
    ///
    /// # Returns
    ///
    /// `true` if the organization existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let name: Option<String> =
            sqlx::query_scalar("DELETE FROM organizations WHERE id = $1 RETURNING name")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(name) = name else {
            return Ok(false);
        };

        let members = User::clear_organization(&mut *tx, &name).await?;

        tx.commit().await?;

        tracing::info!(organization_id = %id, name = %name, members, "Organization deleted");

        Ok(true)
    }

    /// Merges several organizations into one named `new_name`
    ///
    /// The first existing organization in `ids` survives and is renamed; the
    /// rest are deleted. Members of every merged organization end up in
    /// `new_name`, each updated once. If `new_name` belongs to an organization
    /// outside the merge, the unique violation rolls the whole merge back.
    ///
    /// # Returns
    ///
    /// The surviving organization, or `None` if none of the ids exist
    pub async fn merge(
        pool: &PgPool,
        ids: &[Uuid],
        new_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let found = sqlx::query_as::<_, Organization>(
            "SELECT id, name, needs_approval FROM organizations WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        // Keep the caller's ordering so the first listed organization survives
        let mut ordered: Vec<Organization> = ids
            .iter()
            .filter_map(|id| found.iter().find(|org| org.id == *id).cloned())
            .collect();
        ordered.dedup_by_key(|org| org.id);

        let Some(survivor) = ordered.first().cloned() else {
            return Ok(None);
        };

        let old_names: Vec<String> = ordered.iter().map(|org| org.name.clone()).collect();
        let removed: Vec<Uuid> = ordered.iter().skip(1).map(|org| org.id).collect();

        // Delete first so the surviving rename cannot collide with a merged name
        sqlx::query("DELETE FROM organizations WHERE id = ANY($1)")
            .bind(&removed)
            .execute(&mut *tx)
            .await?;

        let merged = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2, needs_approval = FALSE
            WHERE id = $1
            RETURNING id, name, needs_approval
            "#,
        )
        .bind(survivor.id)
        .bind(new_name)
        .fetch_one(&mut *tx)
        .await?;

        let members = User::reassign_organizations(&mut *tx, &old_names, new_name).await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %merged.id,
            merged = old_names.len(),
            members,
            new_name = %new_name,
            "Organizations merged"
        );

        Ok(Some(merged))
    }

    /// Replaces the whole organization table with `names`
    ///
    /// Used when seeding from the organization list file.
    pub async fn replace_all(pool: &PgPool, names: &[String]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM organizations").execute(&mut *tx).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO organizations (name, needs_approval)
            SELECT DISTINCT name, FALSE FROM UNNEST($1::text[]) AS name
            "#,
        )
        .bind(names)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_json() {
        let org = Organization {
            id: Uuid::nil(),
            name: "Acme".to_string(),
            needs_approval: true,
        };

        let json = serde_json::to_value(&org).unwrap();
        assert_eq!(json["name"], "Acme");
        assert_eq!(json["needsApproval"], true);
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
    }
}
