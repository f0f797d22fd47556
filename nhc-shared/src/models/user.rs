/// User model and database operations
///
/// A user is an account holder: one e-mail address, optionally a password,
/// optionally linked Facebook/Google identities, a role, a lifecycle status and
/// the list of challenge participants registered under the account. Users are
/// never hard-deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255),
///     first_name VARCHAR(255) NOT NULL DEFAULT '',
///     last_name VARCHAR(255) NOT NULL DEFAULT '',
///     family VARCHAR(64),
///     organization VARCHAR(255),
///     team VARCHAR(255),
///     sharing, comment, referral, donation, picture  -- text, default ''
///     facebook VARCHAR(255) UNIQUE,
///     google VARCHAR(255) UNIQUE,
///     role user_role NOT NULL DEFAULT 'user',
///     status user_status NOT NULL DEFAULT 'unconfirmed',
///     participants JSONB NOT NULL DEFAULT '[]',
///     code_hash CHAR(64),
///     reset_code_hash CHAR(64),
///     created_at, updated_at TIMESTAMPTZ NOT NULL,
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use nhc_shared::models::user::{CreateUser, User};
/// use nhc_shared::models::role::{Role, UserStatus};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     status: UserStatus::Unconfirmed,
///     ..Default::default()
/// }).await?;
///
/// let found = User::find_by_email(&pool, "USER@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use super::participant::Participant;
use super::role::{Role, UserStatus};
use crate::auth::codes::hash_code;
use crate::identity::Provider;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, family, organization, \
     team, sharing, comment, referral, donation, picture, facebook, google, role, status, \
     participants, code_hash, reset_code_hash, created_at, updated_at, last_login_at";

/// User account
///
/// Secrets (password hash and one-time code digests) are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing)]
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id hash; `None` for accounts created through OAuth
    #[serde(skip)]
    pub password_hash: Option<String>,

    pub first_name: String,

    pub last_name: String,

    /// Family code shared between related accounts
    pub family: Option<String>,

    /// Organization name (not id, so renames cascade by name)
    pub organization: Option<String>,

    pub team: Option<String>,

    /// Who may see this user's progress: `everyone`, `none` or `organization`
    pub sharing: String,

    pub comment: String,

    pub referral: String,

    /// Charity the user chose to support: `ysb`, `cvim` or `none`
    pub donation: String,

    /// Profile picture URL
    pub picture: String,

    /// Linked Facebook user id
    pub facebook: Option<String>,

    /// Linked Google subject id
    pub google: Option<String>,

    pub role: Role,

    pub status: UserStatus,

    pub participants: Json<Vec<Participant>>,

    /// SHA-256 of the pending e-mail confirmation code
    #[serde(skip)]
    pub code_hash: Option<String>,

    /// SHA-256 of the pending password reset code
    #[serde(skip)]
    pub reset_code_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: Option<String>,

    pub first_name: String,

    pub last_name: String,

    pub picture: String,

    pub facebook: Option<String>,

    pub google: Option<String>,

    pub role: Role,

    pub status: UserStatus,

    /// Digest of the e-mail confirmation code, see [`crate::auth::codes`]
    pub code_hash: Option<String>,
}

/// Reduced view of a user handed to administrators
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LimitedUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub family: Option<String>,
    pub organization: Option<String>,
    pub team: Option<String>,
    pub comment: String,
    pub referral: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(rename = "lastLogin")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Administrative edit of a user, addressed by e-mail
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserEdit {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub family: Option<String>,
    pub organization: Option<String>,
    pub team: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_email_key` (or the provider keys)
    /// when the account already exists.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, picture,
                               facebook, google, role, status, code_hash, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.picture)
            .bind(data.facebook)
            .bind(data.google)
            .bind(data.role)
            .bind(data.status)
            .bind(data.code_hash)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Finds the user linked to an external identity
    pub async fn find_by_provider(
        pool: &PgPool,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = $1",
            provider.column()
        );

        sqlx::query_as::<_, User>(&query)
            .bind(provider_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding a plaintext e-mail confirmation code
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE code_hash = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(hash_code(code))
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding a plaintext password reset code
    pub async fn find_by_reset_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_code_hash = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(hash_code(code))
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable profile column of this user back to the database
    ///
    /// # Errors
    ///
    /// `sqlx::Error::RowNotFound` if the user no longer exists, a unique
    /// violation if a provider id is already linked elsewhere.
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, family = $4, organization = $5, team = $6,
                sharing = $7, comment = $8, referral = $9, donation = $10, picture = $11,
                facebook = $12, google = $13, role = $14, status = $15, participants = $16,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(self.id)
            .bind(&self.first_name)
            .bind(&self.last_name)
            .bind(&self.family)
            .bind(&self.organization)
            .bind(&self.team)
            .bind(&self.sharing)
            .bind(&self.comment)
            .bind(&self.referral)
            .bind(&self.donation)
            .bind(&self.picture)
            .bind(&self.facebook)
            .bind(&self.google)
            .bind(self.role)
            .bind(self.status)
            .bind(&self.participants)
            .fetch_one(pool)
            .await
    }

    /// Updates the last login timestamp
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Confirms the user's e-mail address
    ///
    /// Clears the confirmation code. An `unconfirmed` account becomes
    /// `unregistered`; any other status is left alone.
    pub async fn confirm_email(pool: &PgPool, id: Uuid) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET status = CASE WHEN status = 'unconfirmed' THEN 'unregistered'::user_status
                              ELSE status END,
                code_hash = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Stores the digest of a new e-mail confirmation code
    pub async fn set_confirmation_code(
        pool: &PgPool,
        id: Uuid,
        code_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET code_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(code_hash)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the digest of a new password reset code
    pub async fn set_reset_code(
        pool: &PgPool,
        id: Uuid,
        reset_code_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET reset_code_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(reset_code_hash)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and clears any pending reset code
    pub async fn change_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_code_hash = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users for the admin console
    ///
    /// `organization = None` lists every user; otherwise only that organization.
    pub async fn list_limited(
        pool: &PgPool,
        organization: Option<&str>,
    ) -> Result<Vec<LimitedUser>, sqlx::Error> {
        sqlx::query_as::<_, LimitedUser>(
            r#"
            SELECT email, first_name, last_name, family, organization, team, comment,
                   referral, role, status, last_login_at
            FROM users
            WHERE $1::text IS NULL OR organization = $1
            ORDER BY created_at
            "#,
        )
        .bind(organization)
        .fetch_all(pool)
        .await
    }

    /// Applies an administrative edit
    ///
    /// `restrict_to_organization` limits the edit to members of that
    /// organization.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if no matching user exists
    pub async fn apply_edit(
        pool: &PgPool,
        edit: &UserEdit,
        restrict_to_organization: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                family = COALESCE($4, family),
                organization = COALESCE($5, organization),
                team = COALESCE($6, team),
                role = COALESCE($7, role),
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE email = $1 AND ($9::text IS NULL OR organization = $9)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&edit.email)
            .bind(&edit.first_name)
            .bind(&edit.last_name)
            .bind(&edit.family)
            .bind(&edit.organization)
            .bind(&edit.team)
            .bind(edit.role)
            .bind(edit.status)
            .bind(restrict_to_organization)
            .fetch_optional(pool)
            .await
    }

    /// E-mail addresses matching a bulk message audience
    pub async fn find_recipients(
        pool: &PgPool,
        statuses: &[UserStatus],
        roles: &[Role],
        organization: Option<&str>,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT email::text
            FROM users
            WHERE status = ANY($1)
              AND role = ANY($2)
              AND ($3::text IS NULL OR organization = $3)
            ORDER BY email
            "#,
        )
        .bind(statuses)
        .bind(roles)
        .bind(organization)
        .fetch_all(pool)
        .await
    }

    /// Participants of every registered user, optionally limited to an organization
    pub async fn registered_participants(
        pool: &PgPool,
        organization: Option<&str>,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let rows: Vec<Json<Vec<Participant>>> = sqlx::query_scalar(
            r#"
            SELECT participants
            FROM users
            WHERE status = 'registered' AND ($1::text IS NULL OR organization = $1)
            ORDER BY created_at
            "#,
        )
        .bind(organization)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().flat_map(|Json(participants)| participants).collect())
    }

    /// Moves every member of the named organizations to `new_name`
    ///
    /// # Returns
    ///
    /// Number of users updated
    pub async fn reassign_organizations(
        conn: &mut PgConnection,
        old_names: &[String],
        new_name: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET organization = $2, updated_at = NOW()
            WHERE organization = ANY($1)
            "#,
        )
        .bind(old_names)
        .bind(new_name)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes an organization from every member
    ///
    /// # Returns
    ///
    /// Number of users updated
    pub async fn clear_organization(conn: &mut PgConnection, name: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET organization = NULL, updated_at = NOW() WHERE organization = $1",
        )
        .bind(name)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Converts legacy `pending` accounts to `registered`
    pub async fn promote_pending(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = 'registered', updated_at = NOW() WHERE status = 'pending'",
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Registered users with at least one participant lacking a scorecard
    pub async fn find_missing_scorecards(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE status = 'registered'
              AND EXISTS (
                  SELECT 1 FROM jsonb_array_elements(participants) AS p
                  WHERE COALESCE(jsonb_array_length(p -> 'scorecard'), 0) = 0
              )
            "#
        );

        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Whether the account can log in with a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Organization name used to scope admin queries
    ///
    /// Global admins see everything (`None`); organization admins only their
    /// own organization. An organization admin without an organization is
    /// scoped to the empty name, which matches nobody.
    pub fn admin_scope(&self) -> Option<&str> {
        if self.role.is_global_admin() {
            None
        } else {
            Some(self.organization.as_deref().unwrap_or(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role, organization: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: Some("$argon2id$hash".to_string()),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            family: None,
            organization: organization.map(str::to_string),
            team: None,
            sharing: String::new(),
            comment: String::new(),
            referral: String::new(),
            donation: String::new(),
            picture: String::new(),
            facebook: None,
            google: None,
            role,
            status: UserStatus::Registered,
            participants: Json(Vec::new()),
            code_hash: Some("digest".to_string()),
            reset_code_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_create_user_defaults() {
        let create_user = CreateUser::default();

        assert_eq!(create_user.role, Role::User);
        assert_eq!(create_user.status, UserStatus::Unconfirmed);
        assert!(create_user.password_hash.is_none());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let user = sample_user(Role::User, Some("Acme"));
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert!(json.get("codeHash").is_none());
        assert!(json.get("resetCodeHash").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_admin_scope() {
        assert_eq!(sample_user(Role::GlobalAdmin, Some("Acme")).admin_scope(), None);
        assert_eq!(sample_user(Role::GlobalSuperAdmin, None).admin_scope(), None);
        assert_eq!(
            sample_user(Role::OrgAdmin, Some("Acme")).admin_scope(),
            Some("Acme")
        );
        assert_eq!(sample_user(Role::OrgSuperAdmin, None).admin_scope(), Some(""));
    }

    #[test]
    fn test_user_edit_default() {
        let edit = UserEdit::default();
        assert!(edit.role.is_none());
        assert!(edit.status.is_none());
        assert!(edit.organization.is_none());
    }
}
