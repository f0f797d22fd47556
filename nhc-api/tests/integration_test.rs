//! Integration tests for the NHC API
//!
//! These tests verify the full system works end-to-end against PostgreSQL:
//! - Signup, e-mail verification and login
//! - Password reset
//! - Challenge registration and scorecards
//! - Role-guarded administration
//! - OAuth sign-in through a canned provider
//!
//! Run with `cargo test -p nhc-api -- --ignored` and `DATABASE_URL` set.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{code_from_link, send, unique_email, wait_for, TestContext};
use nhc_shared::{
    auth::password::hash_password,
    messages::FORBIDDEN_ERROR,
    models::{
        globals::Globals,
        role::{Role, UserStatus},
        user::{CreateUser, User},
    },
};
use serde_json::json;

async fn create_user(ctx: &TestContext, role: Role, status: UserStatus, password: &str) -> User {
    User::create(
        &ctx.db,
        CreateUser {
            email: unique_email(),
            password_hash: Some(hash_password(password).unwrap()),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            status,
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

fn open_challenge(scorecard_enabled: bool) -> Globals {
    let today = Utc::now().date_naive();
    Globals::new(today - Duration::days(2), today + Duration::days(26), true, scorecard_enabled)
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_signup_verify_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();
    let password = "correct horse battery staple";

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": email,
            "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let token = body["token"].as_str().unwrap().to_string();

    // Duplicate signup
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": email,
            "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&ctx.app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unconfirmed");

    wait_for(|| !ctx.mailer.messages_to(&email).is_empty(), 5).await.unwrap();
    let mail = ctx.mailer.messages_to(&email).remove(0);
    let code = code_from_link(&mail.html_body, "/verify/").unwrap();

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/auth/verify",
        Some(&token),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(&ctx.app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(body["status"], "unregistered");

    // Codes are single use
    let (status, _) = send(&ctx.app, "POST", "/auth/verify", None, Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect password");

    let (status, _) = send(
        &ctx.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": unique_email(), "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_password_reset() {
    let ctx = TestContext::new().await.unwrap();
    let user = create_user(&ctx, Role::User, UserStatus::Unregistered, "old password 123").await;

    let (status, _) = send(
        &ctx.app,
        "POST",
        "/auth/password/forgot",
        None,
        Some(json!({ "email": user.email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    wait_for(|| !ctx.mailer.messages_to(&user.email).is_empty(), 5).await.unwrap();
    let mail = ctx.mailer.messages_to(&user.email).remove(0);
    let code = code_from_link(&mail.html_body, "/reset-password/").unwrap();

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/auth/password/reset",
        None,
        Some(json!({ "code": code, "password": "new password 456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Password changed successfully.");

    let (status, _) = send(
        &ctx.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "new password 456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_registration_and_scorecard() {
    let ctx = TestContext::new().await.unwrap();
    ctx.state.globals.replace(open_challenge(true)).await;

    let user = create_user(&ctx, Role::User, UserStatus::Unregistered, "password 123").await;
    let token = ctx.token_for(user.id);

    // Every invalid field is reported
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/api/registration",
        Some(&token),
        Some(json!({ "donation": "lottery", "participants": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_array().unwrap().len() >= 3);

    let (status, body) = send(
        &ctx.app,
        "POST",
        "/api/registration",
        Some(&token),
        Some(json!({
            "donation": "ysb",
            "sharing": "everyone",
            "family": true,
            "participants": [{
                "firstName": "Ada",
                "lastName": "Lovelace",
                "ageRange": [25, 34],
                "category": "Adult",
                "commitment": "Eat Breakfast"
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let saved = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(saved.status, UserStatus::Registered);
    assert!(saved.family.is_some());
    assert_eq!(saved.participants.len(), 1);
    // 29 days: four full weeks and one extra day
    let scorecard = &saved.participants[0].scorecard;
    assert_eq!(scorecard.len(), 5);
    assert_eq!(scorecard.iter().map(Vec::len).sum::<usize>(), 29);

    wait_for(|| !ctx.mailer.messages_to(&user.email).is_empty(), 5).await.unwrap();

    // Registering twice is refused
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/api/registration",
        Some(&token),
        Some(json!({ "donation": "ysb", "sharing": "everyone", "participants": [{}] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &ctx.app,
        "PUT",
        "/api/participant/scorecard",
        Some(&token),
        Some(json!({ "id": 0, "scorecard": [[0, 1], [0, 1], [0, 1]] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = send(&ctx.app, "GET", "/api/participant", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &ctx.app,
        "PUT",
        "/api/participant/scorecard",
        Some(&token),
        Some(json!({ "id": 7, "scorecard": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_scorecard_disabled() {
    let ctx = TestContext::new().await.unwrap();
    ctx.state.globals.replace(open_challenge(false)).await;

    let user = create_user(&ctx, Role::User, UserStatus::Registered, "password 123").await;
    let token = ctx.token_for(user.id);

    let (status, _) = send(
        &ctx.app,
        "PUT",
        "/api/participant/scorecard",
        Some(&token),
        Some(json!({ "id": 0, "scorecard": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_admin_routes_guarded_by_role() {
    let ctx = TestContext::new().await.unwrap();

    let user = create_user(&ctx, Role::User, UserStatus::Registered, "password 123").await;
    let admin = create_user(&ctx, Role::GlobalAdmin, UserStatus::Registered, "password 123").await;

    let (status, body) = send(&ctx.app, "GET", "/api/admin/user", Some(&ctx.token_for(user.id)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], FORBIDDEN_ERROR);

    let admin_token = ctx.token_for(admin.id);

    let (status, body) = send(&ctx.app, "GET", "/api/admin/user", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());

    let name = format!("Org {}", uuid::Uuid::new_v4().simple());
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/api/admin/organizations",
        Some(&admin_token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(&ctx.app, "GET", "/api/organizations", None, None).await;
    assert!(body.as_array().unwrap().iter().any(|org| org["name"] == name.as_str()));

    // Nobody grants a role above their own
    let (status, _) = send(
        &ctx.app,
        "PUT",
        "/api/admin/user",
        Some(&admin_token),
        Some(json!({
            "email": user.email,
            "firstName": "Test",
            "lastName": "User",
            "role": "global_super_admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nor demotes someone ranked above them
    let superior = create_user(&ctx, Role::GlobalSuperAdmin, UserStatus::Registered, "password 123").await;
    let (status, _) = send(
        &ctx.app,
        "PUT",
        "/api/admin/user",
        Some(&admin_token),
        Some(json!({ "email": superior.email, "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let superior = User::find_by_id(&ctx.db, superior.id).await.unwrap().unwrap();
    assert_eq!(superior.role, Role::GlobalSuperAdmin);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_oauth_sign_in_creates_account() {
    let ctx = TestContext::new().await.unwrap();

    let grant = json!({
        "code": "valid-code",
        "clientId": "client",
        "redirectUri": "https://www.nutritionhabitchallenge.com/"
    });

    let (status, body) = send(&ctx.app, "POST", "/auth/google", None, Some(grant.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let token = body["token"].as_str().unwrap().to_string();

    let (_, first) = send(&ctx.app, "GET", "/auth", Some(&token), None).await;
    assert_eq!(first["firstName"], "Grace");
    assert_eq!(first["status"], "unregistered");

    // Same provider identity signs in to the same account
    let (status, body) = send(&ctx.app, "POST", "/auth/google", None, Some(grant)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = send(&ctx.app, "GET", "/auth", Some(body["token"].as_str().unwrap()), None).await;
    assert_eq!(again["email"], first["email"]);

    let (status, _) = send(
        &ctx.app,
        "POST",
        "/auth/facebook",
        None,
        Some(json!({ "code": "bad-code", "clientId": "client", "redirectUri": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
