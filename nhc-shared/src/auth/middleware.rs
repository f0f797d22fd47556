/// Request identity middleware for Axum
///
/// The session middleware runs on every route. It never rejects an anonymous
/// request; it only rejects requests that present a credential which turns
/// out to be malformed or invalid.
///
/// | `Authorization` header      | Outcome                                   |
/// |-----------------------------|-------------------------------------------|
/// | absent                      | anonymous, request proceeds               |
/// | not `Bearer <token>`        | 400                                       |
/// | invalid token               | 401                                       |
/// | expired token               | 401 `Token expired`                       |
/// | valid token                 | `AuthContext` added to request extensions |
///
/// Handlers that need a session take [`AuthContext`] as an extractor (401 if
/// absent); handlers that merely care take `Option<AuthContext>`.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use nhc_shared::auth::middleware::{create_session_middleware, AuthContext};
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// async fn greet(auth: Option<AuthContext>) -> &'static str {
///     if auth.is_some() { "welcome back" } else { "hello stranger" }
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .route("/greet", get(greet))
///     .layer(middleware::from_fn(create_session_middleware("your-jwt-secret".to_string())));
/// ```

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::messages::MISSING_TOKEN;

/// Authenticated caller, added to request extensions by the session middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID (the token subject)
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for request authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session on a route that requires one
    MissingCredentials,

    /// Authorization header present but not a bearer credential
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        }
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        match self {
            AuthError::MissingCredentials => MISSING_TOKEN,
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(serde_json::json!({
            "error": code,
            "message": self.message(),
        }));

        (status, body).into_response()
    }
}

/// Resolves the `Authorization` header into an optional caller
///
/// # Errors
///
/// `AuthError::InvalidFormat` for a non-bearer header, `AuthError::InvalidToken`
/// for a token that fails validation
pub fn authenticate(
    authorization: Option<&str>,
    secret: &str,
) -> Result<Option<AuthContext>, AuthError> {
    let Some(authorization) = authorization else {
        return Ok(None);
    };

    let token = authorization
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(Some(AuthContext::new(claims.sub)))
}

/// Session middleware
///
/// # Arguments
///
/// * `secret` - JWT secret for validation
/// * `req` - Request
/// * `next` - Next middleware/handler
///
/// # Errors
///
/// See the table in the module documentation
pub async fn session_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::InvalidFormat("Expected Bearer token".to_string()))?,
        ),
        None => None,
    };

    if let Some(auth_context) = authenticate(header_value, &secret)? {
        tracing::trace!(user_id = %auth_context.user_id, "Session authenticated");
        req.extensions_mut().insert(auth_context);
    }

    Ok(next.run(req).await)
}

/// Creates a session middleware closure capturing the JWT secret
pub fn create_session_middleware(
    secret: String,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let secret = secret.clone();
        Box::pin(session_auth_middleware(secret, req, next))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use axum::{body::Body, routing::get, Router};
    use chrono::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn app() -> Router {
        async fn required(auth: AuthContext) -> String {
            auth.user_id.to_string()
        }

        async fn optional(auth: Option<AuthContext>) -> String {
            auth.map(|a| a.user_id.to_string())
                .unwrap_or_else(|| "anonymous".to_string())
        }

        Router::new()
            .route("/required", get(required))
            .route("/optional", get(optional))
            .layer(axum::middleware::from_fn(create_session_middleware(SECRET.to_string())))
    }

    async fn call(uri: &str, authorization: Option<String>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }

        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_session_middleware_owns_secret() {
        fn assert_static<T: 'static>(_: &T) {}

        let middleware = {
            let config_secret = format!("{}-rotated", SECRET);
            create_session_middleware(config_secret.as_str().to_owned())
        };
        assert_static(&middleware);
    }

    #[test]
    fn test_authenticate_without_header_is_anonymous() {
        assert_eq!(authenticate(None, SECRET), Ok(None));
    }

    #[test]
    fn test_authenticate_rejects_non_bearer() {
        let err = authenticate(Some("Basic dXNlcjpwYXNz"), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));

        let err = authenticate(Some("Bearer "), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));
    }

    #[test]
    fn test_authenticate_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();

        let context = authenticate(Some(&format!("Bearer {}", token)), SECRET)
            .unwrap()
            .unwrap();
        assert_eq!(context.user_id, user_id);
    }

    #[test]
    fn test_authenticate_expired_token() {
        let claims = Claims::with_expiration(Uuid::new_v4(), Duration::seconds(-10));
        let token = create_token(&claims, SECRET).unwrap();

        let err = authenticate(Some(&format!("Bearer {}", token)), SECRET).unwrap_err();
        assert_eq!(err, AuthError::InvalidToken("Token expired".to_string()));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidToken("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_anonymous_request_reaches_optional_handler() {
        let (status, body) = call("/optional", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_required_handler_rejects_anonymous() {
        let (status, body) = call("/required", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains(MISSING_TOKEN));
    }

    #[tokio::test]
    async fn test_valid_token_reaches_required_handler() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();

        let (status, body) = call("/required", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user_id.to_string());
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected_even_on_optional_route() {
        let (status, _) = call("/optional", Some("Bearer not-a-jwt".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
