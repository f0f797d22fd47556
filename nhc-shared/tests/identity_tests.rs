//! Identity provider and profanity filter tests against a local mock server

use std::collections::HashMap;

use axum::extract::{Form, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use nhc_shared::identity::facebook::FacebookProvider;
use nhc_shared::identity::google::GoogleProvider;
use nhc_shared::identity::{AuthorizationGrant, IdentityProvider, OAuthError, Provider};
use nhc_shared::profanity::{HttpProfanityFilter, ProfanityFilter};
use serde_json::{json, Value};

/// Serves `router` on a random local port and returns its base URL
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

fn grant(code: &str) -> AuthorizationGrant {
    AuthorizationGrant {
        code: code.to_string(),
        client_id: "client-id".to_string(),
        redirect_uri: "https://nhc.example.org/auth/callback".to_string(),
    }
}

fn facebook_mock() -> Router {
    Router::new()
        .route(
            "/v2.5/oauth/access_token",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let valid = params.get("code").map(String::as_str) == Some("good-code")
                    && params.get("client_secret").map(String::as_str) == Some("fb-secret")
                    && params.contains_key("redirect_uri");

                if valid {
                    (StatusCode::OK, Json(json!({ "access_token": "fb-token" })))
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": { "message": "Invalid verification code format." } })),
                    )
                }
            }),
        )
        .route(
            "/v2.5/me",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("access_token").map(String::as_str), Some("fb-token"));
                Json(json!({
                    "id": "10001",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "ada@example.com"
                }))
            }),
        )
}

fn google_mock() -> Router {
    Router::new()
        .route(
            "/token",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                if params.get("grant_type").map(String::as_str) != Some("authorization_code") {
                    return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported_grant_type" })));
                }

                if params.get("code").map(String::as_str) != Some("good-code") {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
                    );
                }

                (StatusCode::OK, Json(json!({ "access_token": "g-token", "token_type": "Bearer" })))
            }),
        )
        .route(
            "/userinfo",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    == Some("Bearer g-token");

                if !authorized {
                    return (StatusCode::UNAUTHORIZED, Json(Value::Null));
                }

                (
                    StatusCode::OK,
                    Json(json!({
                        "sub": "g-42",
                        "given_name": "Grace",
                        "family_name": "Hopper",
                        "email": "grace@example.com",
                        "email_verified": "true",
                        "picture": "https://lh3.example.com/photo.jpg?sz=50"
                    })),
                )
            }),
        )
}

#[tokio::test]
async fn test_facebook_exchange() {
    let base = serve(facebook_mock()).await;
    let provider = FacebookProvider::new(reqwest::Client::new(), &base, "fb-secret");

    assert_eq!(provider.provider(), Provider::Facebook);

    let profile = provider.exchange(&grant("good-code")).await.unwrap();

    assert_eq!(profile.provider, Provider::Facebook);
    assert_eq!(profile.provider_id, "10001");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    assert!(profile.email_verified);
    assert_eq!(
        profile.picture,
        Some(format!("{}/v2.5/10001/picture?type=large", base))
    );
}

#[tokio::test]
async fn test_facebook_error_message_is_passed_through() {
    let base = serve(facebook_mock()).await;
    let provider = FacebookProvider::new(reqwest::Client::new(), &base, "fb-secret");

    let error = provider.exchange(&grant("bad-code")).await.unwrap_err();

    match error {
        OAuthError::Provider(message) => assert_eq!(message, "Invalid verification code format."),
        other => panic!("Expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_google_exchange() {
    let base = serve(google_mock()).await;
    let provider = GoogleProvider::new(
        reqwest::Client::new(),
        format!("{}/token", base),
        format!("{}/userinfo", base),
        "g-secret",
    );

    let profile = provider.exchange(&grant("good-code")).await.unwrap();

    assert_eq!(profile.provider, Provider::Google);
    assert_eq!(profile.provider_id, "g-42");
    assert_eq!(profile.last_name, "Hopper");
    assert!(profile.email_verified);
    assert_eq!(
        profile.picture.as_deref(),
        Some("https://lh3.example.com/photo.jpg?sz=200")
    );
}

#[tokio::test]
async fn test_google_rejected_code() {
    let base = serve(google_mock()).await;
    let provider = GoogleProvider::new(
        reqwest::Client::new(),
        format!("{}/token", base),
        format!("{}/userinfo", base),
        "g-secret",
    );

    let error = provider.exchange(&grant("stale-code")).await.unwrap_err();
    assert!(matches!(error, OAuthError::Provider(_)));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let provider = FacebookProvider::new(reqwest::Client::new(), "http://127.0.0.1:1", "fb-secret");

    let error = provider.exchange(&grant("good-code")).await.unwrap_err();
    assert!(matches!(error, OAuthError::Transport(_)));
}

fn profanity_mock() -> Router {
    Router::new().route(
        "/check",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let text = params.get("q").cloned().unwrap_or_default().to_lowercase();
            match text.as_str() {
                "broken" => Json(json!({ "response": "maybe" })),
                _ => Json(json!({ "response": text.contains("darn").to_string() })),
            }
        }),
    )
}

#[tokio::test]
async fn test_http_profanity_filter() {
    let base = serve(profanity_mock()).await;
    let filter = HttpProfanityFilter::new(reqwest::Client::new(), format!("{}/check", base));

    assert!(filter.is_profane("well darn").await);
    assert!(!filter.is_profane("Acme Corporation").await);
    assert!(!filter.is_profane("").await);
}

#[tokio::test]
async fn test_http_profanity_filter_fails_open_on_bad_answer() {
    let base = serve(profanity_mock()).await;
    let filter = HttpProfanityFilter::new(reqwest::Client::new(), format!("{}/check", base));

    assert!(!filter.is_profane("broken").await);
}
