/// Sign-in with Facebook and Google
///
/// The browser completes the provider's consent screen and hands the API an
/// authorization code. An [`IdentityProvider`] exchanges that code for an
/// access token and fetches the user's profile; [`link_or_create`] then maps
/// the external identity onto a local account:
///
/// - **Signed in**: the identity is linked to the caller's account, unless it
///   already belongs to some account.
/// - **Anonymous**: the account already linked to the identity is returned;
///   otherwise an account with the same verified e-mail address gets linked;
///   otherwise a new account is created.
///
/// # Example
///
/// ```no_run
/// use nhc_shared::identity::{link_or_create, AuthorizationGrant, IdentityProvider};
/// use nhc_shared::identity::google::GoogleProvider;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let google = GoogleProvider::new(
///     reqwest::Client::new(),
///     "https://oauth2.googleapis.com/token",
///     "https://openidconnect.googleapis.com/v1/userinfo",
///     "client-secret",
/// );
///
/// let grant = AuthorizationGrant {
///     code: "4/abc".to_string(),
///     client_id: "client-id".to_string(),
///     redirect_uri: "https://nutritionhabitchallenge.com".to_string(),
/// };
///
/// let profile = google.exchange(&grant).await?;
/// let user = link_or_create(&pool, &profile, None).await?;
/// # Ok(())
/// # }
/// ```

pub mod facebook;
pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use crate::models::role::{Role, UserStatus};
use crate::models::user::{CreateUser, User};

/// Supported external identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Facebook,
    Google,
}

impl Provider {
    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Facebook => "Facebook",
            Provider::Google => "Google",
        }
    }

    /// Column of `users` holding this provider's user id
    pub fn column(&self) -> &'static str {
        match self {
            Provider::Facebook => "facebook",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authorization code handed over by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
}

/// Profile returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub provider: Provider,

    /// Provider's stable user id
    pub provider_id: String,

    pub first_name: String,

    pub last_name: String,

    /// Absent when the user declined to share it
    pub email: Option<String>,

    pub picture: Option<String>,

    /// The provider vouches for the e-mail address
    pub email_verified: bool,
}

/// Error type for provider calls
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Provider answered with an error status
    #[error("{0}")]
    Provider(String),

    /// Request never got an answer
    #[error("Failed to reach identity provider: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with something we cannot read
    #[error("Unexpected response from identity provider: {0}")]
    InvalidResponse(String),
}

/// OAuth2 authorization code exchange for one provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Exchanges the authorization code and fetches the user's profile
    async fn exchange(&self, grant: &AuthorizationGrant) -> Result<ExternalProfile, OAuthError>;
}

/// Error type for mapping an external identity onto an account
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Identity is already linked to an account
    #[error("There is already a {0} account that belongs to you")]
    AlreadyLinked(Provider),

    /// Session refers to a user that no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Provider did not share an e-mail address for a new account
    #[error("You cannot sign up without sharing your email with NHC.")]
    EmailRequired,

    /// Account creation collided with an existing account
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);

        if unique_violation {
            IdentityError::Conflict("An account with this e-mail address already exists".to_string())
        } else {
            IdentityError::Database(err)
        }
    }
}

fn set_provider_id(user: &mut User, provider: Provider, provider_id: &str) {
    match provider {
        Provider::Facebook => user.facebook = Some(provider_id.to_string()),
        Provider::Google => user.google = Some(provider_id.to_string()),
    }
}

fn link_profile(user: &mut User, profile: &ExternalProfile) {
    set_provider_id(user, profile.provider, &profile.provider_id);

    if user.picture.is_empty() {
        if let Some(picture) = &profile.picture {
            user.picture = picture.clone();
        }
    }
}

/// Maps an external identity onto a local account
///
/// `caller` is the signed-in user, if any. See the module documentation for
/// the rules.
///
/// # Errors
///
/// - `IdentityError::AlreadyLinked` if a signed-in caller links an identity
///   that belongs to an account
/// - `IdentityError::UserNotFound` if the caller no longer exists
/// - `IdentityError::EmailRequired` if a new account would have no e-mail
/// - `IdentityError::Conflict` if the e-mail belongs to an account that
///   cannot be linked automatically
pub async fn link_or_create(
    pool: &PgPool,
    profile: &ExternalProfile,
    caller: Option<Uuid>,
) -> Result<User, IdentityError> {
    let provider = profile.provider;
    let existing = User::find_by_provider(pool, provider, &profile.provider_id).await?;

    if let Some(caller) = caller {
        if existing.is_some() {
            return Err(IdentityError::AlreadyLinked(provider));
        }

        let mut user = User::find_by_id(pool, caller)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        link_profile(&mut user, profile);
        let user = user.save(pool).await?;

        tracing::info!(user_id = %user.id, provider = %provider, "Linked external identity");
        return Ok(user);
    }

    if let Some(user) = existing {
        User::update_last_login(pool, user.id).await?;
        return Ok(user);
    }

    let email = profile
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or(IdentityError::EmailRequired)?;

    if let Some(mut user) = User::find_by_email(pool, email).await? {
        if !profile.email_verified {
            return Err(IdentityError::Conflict(format!(
                "An account for {} already exists. Please log in and link your {} account.",
                email, provider
            )));
        }

        link_profile(&mut user, profile);
        let user = user.save(pool).await?;
        User::update_last_login(pool, user.id).await?;

        tracing::info!(user_id = %user.id, provider = %provider, "Linked external identity by e-mail");
        return Ok(user);
    }

    let mut new_user = CreateUser {
        email: email.to_string(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        picture: profile.picture.clone().unwrap_or_default(),
        role: Role::User,
        status: if profile.email_verified {
            UserStatus::Unregistered
        } else {
            UserStatus::Unconfirmed
        },
        ..Default::default()
    };

    match provider {
        Provider::Facebook => new_user.facebook = Some(profile.provider_id.clone()),
        Provider::Google => new_user.google = Some(profile.provider_id.clone()),
    }

    let user = User::create(pool, new_user).await?;

    tracing::info!(user_id = %user.id, provider = %provider, "Created account from external identity");
    Ok(user)
}

/// Turns a non-2xx provider response into an [`OAuthError::Provider`]
///
/// Understands both `{"error": {"message": ...}}` (Facebook, Google APIs)
/// and `{"error": "...", "error_description": ...}` (OAuth2 token endpoints).
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, OAuthError> {
    let status = response.status();

    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        return Err(OAuthError::Provider(provider_error_message(&body, status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| OAuthError::InvalidResponse(e.to_string()))
}

fn provider_error_message(body: &serde_json::Value, status: reqwest::StatusCode) -> String {
    let error = &body["error"];

    if let Some(message) = error["message"].as_str() {
        return message.to_string();
    }

    if let Some(description) = body["error_description"].as_str() {
        return description.to_string();
    }

    if let Some(code) = error.as_str() {
        return code.to_string();
    }

    format!("Identity provider returned {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::Facebook.to_string(), "Facebook");
        assert_eq!(Provider::Google.column(), "google");
    }

    #[test]
    fn test_already_linked_message() {
        assert_eq!(
            IdentityError::AlreadyLinked(Provider::Google).to_string(),
            "There is already a Google account that belongs to you"
        );
    }

    #[test]
    fn test_grant_uses_camel_case() {
        let grant: AuthorizationGrant = serde_json::from_value(json!({
            "code": "abc",
            "clientId": "id",
            "redirectUri": "https://example.org"
        }))
        .unwrap();

        assert_eq!(grant.client_id, "id");
        assert_eq!(grant.redirect_uri, "https://example.org");
    }

    #[test]
    fn test_provider_error_message_shapes() {
        let status = reqwest::StatusCode::BAD_REQUEST;

        let graph = json!({"error": {"message": "Invalid verification code format."}});
        assert_eq!(
            provider_error_message(&graph, status),
            "Invalid verification code format."
        );

        let oauth = json!({"error": "invalid_grant", "error_description": "Bad Request"});
        assert_eq!(provider_error_message(&oauth, status), "Bad Request");

        let bare = json!({"error": "invalid_client"});
        assert_eq!(provider_error_message(&bare, status), "invalid_client");

        assert_eq!(
            provider_error_message(&serde_json::Value::Null, status),
            "Identity provider returned 400 Bad Request"
        );
    }
}
