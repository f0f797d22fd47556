/// Participants and scorecards
///
/// # Endpoints
///
/// - `GET /api/participant` - The caller's participants
/// - `PUT /api/participant/scorecard` - Replace one participant's scorecard
/// - `GET /api/admin/participant` - Participants of every registered user
///   (organization admins see their organization only)

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{status, StatusResponse},
};
use axum::{extract::State, Json};
use chrono::Utc;
use nhc_shared::{
    auth::{
        authorization::{current_user, require_role},
        middleware::AuthContext,
    },
    models::{participant::Participant, role::Role, user::User},
    registration,
};
use serde::Deserialize;

/// Scorecard submission
#[derive(Debug, Deserialize)]
pub struct ScorecardRequest {
    /// Participant id within the caller's account
    pub id: usize,

    /// One row per week; cells after today are cleared
    pub scorecard: Vec<Vec<i64>>,
}

pub async fn list_own(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Participant>>> {
    let user = current_user(&state.db, &auth).await?;
    Ok(Json(user.participants.0))
}

/// Updates a scorecard and recomputes the participant's points
///
/// # Errors
///
/// - `403 Forbidden`: Scorecard updates are disabled
/// - `404 Not Found`: The caller has no participant with that id
pub async fn update_scorecard(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ScorecardRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let user = current_user(&state.db, &auth).await?;
    let globals = state.globals.snapshot().await;
    let today = Utc::now().date_naive();

    registration::update_scorecard(&state.db, user, req.id, &req.scorecard, &globals, today)
        .await?;

    Ok(status("Scorecard updated successfully."))
}

pub async fn list_registered(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Participant>>> {
    let admin = require_role(&state.db, &auth, Role::OrgAdmin).await?;
    let participants = User::registered_participants(&state.db, admin.admin_scope()).await?;

    Ok(Json(participants))
}
