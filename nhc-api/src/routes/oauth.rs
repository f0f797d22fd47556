/// Facebook and Google sign-in
///
/// # Endpoints
///
/// - `POST /auth/facebook`
/// - `POST /auth/google`
///
/// Both take the authorization code from the provider's consent screen:
///
/// ```json
/// { "code": "...", "clientId": "...", "redirectUri": "https://nutritionhabitchallenge.com" }
/// ```
///
/// and answer with a session token. A signed-in caller links the identity to
/// their account instead of signing in.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::TokenResponse,
};
use axum::{extract::State, Json};
use nhc_shared::{
    auth::{jwt::issue_session_token, middleware::AuthContext},
    identity::{link_or_create, AuthorizationGrant, IdentityProvider},
};

pub async fn facebook(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Json(grant): Json<AuthorizationGrant>,
) -> ApiResult<Json<TokenResponse>> {
    let provider = state.facebook.clone();
    sign_in(&state, provider.as_ref(), auth, grant).await
}

pub async fn google(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Json(grant): Json<AuthorizationGrant>,
) -> ApiResult<Json<TokenResponse>> {
    let provider = state.google.clone();
    sign_in(&state, provider.as_ref(), auth, grant).await
}

async fn sign_in(
    state: &AppState,
    provider: &dyn IdentityProvider,
    auth: Option<AuthContext>,
    grant: AuthorizationGrant,
) -> ApiResult<Json<TokenResponse>> {
    if grant.code.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing authorization code.".to_string()));
    }

    let profile = provider.exchange(&grant).await?;
    let user = link_or_create(&state.db, &profile, auth.map(|auth| auth.user_id)).await?;

    tracing::info!(user_id = %user.id, provider = %provider.provider(), "OAuth sign-in");

    let token = issue_session_token(user.id, state.jwt_secret())?;
    Ok(Json(TokenResponse { token }))
}
