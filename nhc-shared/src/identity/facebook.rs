/// Facebook Graph API sign-in

use async_trait::async_trait;
use serde::Deserialize;

use super::{read_json, AuthorizationGrant, ExternalProfile, IdentityProvider, OAuthError, Provider};

/// Production Graph API base URL
pub const GRAPH_URL: &str = "https://graph.facebook.com";

const API_VERSION: &str = "v2.5";

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GraphProfile {
    id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    email: Option<String>,
}

pub struct FacebookProvider {
    client: reqwest::Client,
    graph_url: String,
    client_secret: String,
}

impl FacebookProvider {
    pub fn new(
        client: reqwest::Client,
        graph_url: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            graph_url: graph_url.into().trim_end_matches('/').to_string(),
            client_secret: client_secret.into(),
        }
    }

    fn picture_url(&self, id: &str) -> String {
        format!("{}/{}/{}/picture?type=large", self.graph_url, API_VERSION, id)
    }
}

#[async_trait]
impl IdentityProvider for FacebookProvider {
    fn provider(&self) -> Provider {
        Provider::Facebook
    }

    async fn exchange(&self, grant: &AuthorizationGrant) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .client
            .get(format!("{}/{}/oauth/access_token", self.graph_url, API_VERSION))
            .query(&[
                ("code", grant.code.as_str()),
                ("client_id", grant.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", grant.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let token: AccessToken = read_json(response).await?;

        let response = self
            .client
            .get(format!("{}/{}/me", self.graph_url, API_VERSION))
            .query(&[
                ("access_token", token.access_token.as_str()),
                ("fields", "id,first_name,last_name,email"),
            ])
            .send()
            .await?;

        let profile: GraphProfile = read_json(response).await?;

        tracing::debug!(facebook_id = %profile.id, "Fetched Facebook profile");

        Ok(ExternalProfile {
            provider: Provider::Facebook,
            picture: Some(self.picture_url(&profile.id)),
            provider_id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            email_verified: true,
        })
    }
}
