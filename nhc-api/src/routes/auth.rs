/// Authentication endpoints
///
/// Local e-mail/password accounts, e-mail verification and password reset.
///
/// # Endpoints
///
/// - `GET  /auth/` - Current user's profile summary
/// - `POST /auth/login` - Log in and get a session token
/// - `POST /auth/signup` - Create an account and send a verification e-mail
/// - `POST /auth/verify` - Confirm an e-mail address with the mailed code
/// - `GET  /auth/verify` - Send a fresh verification e-mail
/// - `POST /auth/password/forgot` - Mail a password reset link
/// - `POST /auth/password/reset` - Set a new password with the mailed code

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{any_blank, status, StatusResponse, TokenResponse},
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use nhc_shared::{
    auth::{
        authorization::current_user,
        codes::generate_code,
        jwt::issue_session_token,
        middleware::AuthContext,
        password::{hash_password_blocking, validate_password, verify_password_blocking},
    },
    models::{
        role::{Role, UserStatus},
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Reply to a password reset request, whether or not the account exists
pub const FORGOT_PASSWORD_STATUS: &str =
    "If an account exists for that e-mail address, a password reset link has been sent.";

/// Profile summary of the signed-in user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: String,
    pub role: Role,
    pub status: UserStatus,
}

/// Login request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signup request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    #[validate(length(max = 100, message = "First name must be at most 100 characters"))]
    pub first_name: String,

    #[validate(length(max = 100, message = "Last name must be at most 100 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub code: String,
    pub password: String,
}

fn password_error(message: String) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: "password".to_string(),
        message,
    }])
}

fn token_for(state: &AppState, user: &User) -> ApiResult<Json<TokenResponse>> {
    let token = issue_session_token(user.id, state.jwt_secret())?;
    Ok(Json(TokenResponse { token }))
}

/// Returns the signed-in user's profile summary
pub async fn current(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = current_user(&state.db, &auth).await?;

    Ok(Json(CurrentUserResponse {
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        picture: user.picture,
        role: user.role,
        status: user.status,
    }))
}

/// Logs in with e-mail and password
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// { "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing e-mail or password
/// - `404 Not Found`: No account with that e-mail
/// - `401 Unauthorized`: Wrong password, or an OAuth-only account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if any_blank(&[&req.email, &req.password]) {
        return Err(ApiError::BadRequest("Missing credentials".to_string()));
    }

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User wasn't found on our servers".to_string()))?;

    let valid = match user.password_hash.as_deref() {
        Some(hash) => verify_password_blocking(&req.password, hash).await?,
        None => false,
    };

    if !valid {
        tracing::info!(user_id = %user.id, "Failed login attempt");
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    token_for(&state, &user)
}

/// Creates a local account
///
/// The account starts `unconfirmed` and a verification e-mail is queued.
///
/// # Errors
///
/// - `400 Bad Request`: A field is missing
/// - `422 Unprocessable Entity`: Invalid e-mail or weak password
/// - `409 Conflict`: An account with that e-mail exists
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if any_blank(&[&req.first_name, &req.last_name, &req.email, &req.password]) {
        return Err(ApiError::BadRequest("Missing information".to_string()));
    }

    req.validate()?;
    validate_password(&req.password).map_err(password_error)?;

    let password_hash = hash_password_blocking(&req.password).await?;
    let (code, code_hash) = generate_code();

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash: Some(password_hash),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            role: Role::User,
            status: UserStatus::Unconfirmed,
            code_hash: Some(code_hash),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    state.send_mail(state.templates.verification(&user.email, &user.first_name, &code));

    token_for(&state, &user)
}

/// Confirms an e-mail address
///
/// Anonymous callers (following the link in a fresh browser) get a session
/// token; signed-in callers get `{"status": "ok"}`.
///
/// # Errors
///
/// - `400 Bad Request`: Missing code
/// - `404 Not Found`: Unknown or already used code
pub async fn verify(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Response> {
    if req.code.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing verification code.".to_string()));
    }

    let user = User::find_by_code(&state.db, &req.code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Verification code not found.".to_string()))?;

    let user = User::confirm_email(&state.db, user.id).await?;
    tracing::info!(user_id = %user.id, status = %user.status, "E-mail confirmed");

    match auth {
        None => Ok(token_for(&state, &user)?.into_response()),
        Some(_) => Ok(status("ok").into_response()),
    }
}

/// Generates a new verification code and mails it to the signed-in user
///
/// # Errors
///
/// - `400 Bad Request`: The address is already confirmed
pub async fn resend_verification(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<StatusResponse>> {
    let user = current_user(&state.db, &auth).await?;

    if user.status != UserStatus::Unconfirmed {
        return Err(ApiError::BadRequest(
            "Your e-mail address is already confirmed.".to_string(),
        ));
    }

    let (code, code_hash) = generate_code();
    User::set_confirmation_code(&state.db, user.id, &code_hash).await?;

    state.send_mail(state.templates.verification(&user.email, &user.first_name, &code));

    Ok(status(format!(
        "Your verification e-mail has been resent to {}.",
        user.email
    )))
}

/// Mails a password reset link
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing information".to_string()));
    }
    req.validate()?;

    match User::find_by_email(&state.db, req.email.trim()).await? {
        Some(user) => {
            let (code, code_hash) = generate_code();
            User::set_reset_code(&state.db, user.id, &code_hash).await?;

            state.send_mail(state.templates.password_reset(&user.email, &user.first_name, &code));
            tracing::info!(user_id = %user.id, "Password reset requested");
        }
        None => tracing::debug!("Password reset requested for unknown e-mail"),
    }

    Ok(status(FORGOT_PASSWORD_STATUS))
}

/// Sets a new password using a mailed reset code
///
/// # Errors
///
/// - `400 Bad Request`: Missing code or password
/// - `422 Unprocessable Entity`: Weak password
/// - `404 Not Found`: Unknown or already used code
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    if any_blank(&[&req.code, &req.password]) {
        return Err(ApiError::BadRequest("Missing information".to_string()));
    }

    validate_password(&req.password).map_err(password_error)?;

    let user = User::find_by_reset_code(&state.db, &req.code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Password reset code not found.".to_string()))?;

    let password_hash = hash_password_blocking(&req.password).await?;
    User::change_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(status("Password changed successfully."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_parses_camel_case() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com", "password": "analytical"}"#,
        )
        .unwrap();

        assert_eq!(req.first_name, "Ada");
        assert_eq!(req.last_name, "Lovelace");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_signup_rejects_invalid_email() {
        let req = SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "not-an-email".to_string(),
            password: "analytical".to_string(),
        };

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"email": "ada@example.com"}"#).unwrap();
        assert!(req.password.is_empty());
        assert!(any_blank(&[&req.email, &req.password]));
    }

    #[test]
    fn test_current_user_response_shape() {
        let body = serde_json::to_value(CurrentUserResponse {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            picture: String::new(),
            role: Role::OrgAdmin,
            status: UserStatus::Registered,
        })
        .unwrap();

        assert_eq!(body["firstName"], "Ada");
        assert_eq!(body["role"], "org_admin");
        assert_eq!(body["status"], "registered");
    }
}
