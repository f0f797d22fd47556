//! Router tests that run without a database
//!
//! Every request here is answered before a handler touches the pool:
//! session checks, input validation, in-memory settings and middleware.

mod common;

use axum::http::{header, StatusCode};
use common::{offline_app, send, send_raw};
use nhc_shared::messages::MISSING_TOKEN;
use serde_json::json;

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = offline_app();

    for (method, uri) in [
        ("GET", "/auth"),
        ("GET", "/auth/verify"),
        ("POST", "/api/registration"),
        ("PUT", "/api/user"),
        ("GET", "/api/news"),
        ("GET", "/api/bonus-question"),
        ("GET", "/api/participant"),
        ("PUT", "/api/participant/scorecard"),
        ("POST", "/api/globals"),
        ("GET", "/api/admin/user"),
        ("POST", "/api/admin/message"),
        ("DELETE", "/api/admin/news/5b0a2a6e-7c4e-4a57-9d3e-1f1f2f3f4f5f"),
    ] {
        let (status, body) = send(&app, method, uri, None, Some(json!({}))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["message"], MISSING_TOKEN, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_non_bearer_authorization_rejected() {
    let app = offline_app();

    let request = axum::http::Request::builder()
        .uri("/api/globals")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = offline_app();

    let (status, body) = send(&app, "GET", "/auth", Some("not-a-jwt"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_globals_served_from_memory() {
    let app = offline_app();

    let (status, body) = send(&app, "GET", "/api/globals", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["challengeStart"].is_string());
    assert!(body["challengeEnd"].is_string());
    assert!(body["challengeLength"].as_i64().unwrap() > 0);
    assert!(body["registrationOpen"].is_boolean());
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = offline_app();

    let response = send_raw(&app, "GET", "/api/globals", None, None).await;
    let headers = response.headers();

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    // Test environment does not send HSTS
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = offline_app();

    let (status, _) = send(&app, "GET", "/api/does-not-exist", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_missing_credentials() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing credentials");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = offline_app();

    let (status, body) = send(&app, "POST", "/auth/signup", None, Some(json!({ "email": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing information");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "not-an-email",
            "password": "correct horse battery staple"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "password": "short"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_oauth_requires_code() {
    let app = offline_app();

    for uri in ["/auth/facebook", "/auth/google"] {
        let (status, body) = send(
            &app,
            "POST",
            uri,
            None,
            Some(json!({
                "code": " ",
                "clientId": "client",
                "redirectUri": "https://www.nutritionhabitchallenge.com/"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["message"], "Missing authorization code.");
    }
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let app = offline_app();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert!(response.status().is_client_error());
}
