/// Challenge registration
///
/// # Endpoint
///
/// ```text
/// POST /api/registration
/// Authorization: Bearer <token>
///
/// {
///   "organization": "Acme",
///   "donation": "ysb",
///   "sharing": "organization",
///   "family": true,
///   "participants": [{ "firstName": "Ada", "lastName": "Lovelace", "ageRange": [25, 34],
///                      "category": "Vegetables", "commitment": "Eat 5 servings" }]
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Unconfirmed, already registered, not allowed, or registration closed
/// - `422 Unprocessable Entity`: Every invalid field, in `details`

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{status, StatusResponse},
};
use axum::{extract::State, Json};
use nhc_shared::{
    auth::{authorization::current_user, middleware::AuthContext},
    registration::{register as register_user, RegistrationRequest},
};

pub async fn register(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RegistrationRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let user = current_user(&state.db, &auth).await?;
    let globals = state.globals.snapshot().await;

    let user = register_user(&state.db, user, req, &globals, state.profanity.as_ref()).await?;

    state.send_mail(state.templates.registration_confirmation(
        &user.email,
        &user.first_name,
        user.family.as_deref(),
        &user.donation,
    ));

    Ok(status("Registration complete."))
}
