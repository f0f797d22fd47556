/// Google OpenID Connect sign-in

use async_trait::async_trait;
use serde::Deserialize;

use super::{read_json, AuthorizationGrant, ExternalProfile, IdentityProvider, OAuthError, Provider};

/// Production token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Production userinfo endpoint
pub const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    picture: Option<String>,
}

/// `email_verified` arrives as a boolean or as `"true"`/`"false"`
fn parse_verified(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(verified)) => *verified,
        Some(serde_json::Value::String(verified)) => verified.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Asks for the 200px rendition of a profile picture
fn large_picture(url: &str) -> String {
    url.replace("sz=50", "sz=200")
}

pub struct GoogleProvider {
    client: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    client_secret: String,
}

impl GoogleProvider {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            userinfo_url: userinfo_url.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn exchange(&self, grant: &AuthorizationGrant) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", grant.code.as_str()),
                ("client_id", grant.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", grant.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let token: AccessToken = read_json(response).await?;

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let info: UserInfo = read_json(response).await?;

        tracing::debug!(google_id = %info.sub, "Fetched Google profile");

        Ok(ExternalProfile {
            provider: Provider::Google,
            email_verified: parse_verified(info.email_verified.as_ref()),
            provider_id: info.sub,
            first_name: info.given_name,
            last_name: info.family_name,
            email: info.email,
            picture: info.picture.as_deref().map(large_picture),
        })
    }
}
