/// Role checks against the stored user
///
/// Roles live on the user row, not in the token, so a role change takes effect
/// on the caller's next request. Guards load the caller and compare roles
/// through the [`Role`] ordering.
///
/// # Example
///
/// ```no_run
/// use nhc_shared::auth::authorization::{require_role, AuthzError};
/// use nhc_shared::auth::middleware::AuthContext;
/// use nhc_shared::models::role::Role;
/// use sqlx::PgPool;
///
/// async fn delete_news(pool: &PgPool, auth: &AuthContext) -> Result<(), AuthzError> {
///     let admin = require_role(pool, auth, Role::GlobalAdmin).await?;
///     println!("{} may delete news", admin.email);
///     Ok(())
/// }
/// ```

use sqlx::PgPool;

use super::middleware::AuthContext;
use crate::models::role::Role;
use crate::models::user::User;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Token subject does not match any user
    #[error("User not found")]
    UnknownUser,

    /// User doesn't have required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that `role` satisfies `required`
///
/// # Errors
///
/// `AuthzError::InsufficientRole` if the role is below the requirement
pub fn check_role(role: Role, required: Role) -> Result<(), AuthzError> {
    if role.has_permission(required) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required,
            actual: role,
        })
    }
}

/// Loads the caller
///
/// # Errors
///
/// `AuthzError::UnknownUser` if the session refers to a user that no longer exists
pub async fn current_user(pool: &PgPool, auth: &AuthContext) -> Result<User, AuthzError> {
    User::find_by_id(pool, auth.user_id)
        .await?
        .ok_or(AuthzError::UnknownUser)
}

/// Loads the caller and checks their role
///
/// # Returns
///
/// The caller, when their role is at or above `required`
///
/// # Errors
///
/// - `AuthzError::UnknownUser` if the caller no longer exists
/// - `AuthzError::InsufficientRole` if the caller's role is too low
pub async fn require_role(
    pool: &PgPool,
    auth: &AuthContext,
    required: Role,
) -> Result<User, AuthzError> {
    let user = current_user(pool, auth).await?;

    if let Err(err) = check_role(user.role, required) {
        tracing::warn!(
            user_id = %user.id,
            role = %user.role,
            required = %required,
            "Insufficient role"
        );
        return Err(err);
    }

    Ok(user)
}

/// Checks whether `actor` may change a user holding `current` to `target`
///
/// Nobody may grant a role above their own or change the role of someone
/// ranked above them.
pub fn can_assign_role(actor: Role, current: Role, target: Role) -> bool {
    actor.is_global_admin() && actor >= current && actor >= target
}
