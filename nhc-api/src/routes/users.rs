/// Profile updates and user administration
///
/// # Endpoints
///
/// - `PUT /api/user` - Update the caller's own name or organization
/// - `GET /api/admin/user` - List users (organization admins: their organization)
/// - `PUT /api/admin/user` - Edit a user addressed by e-mail

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{status, StatusResponse},
};
use axum::{extract::State, Json};
use nhc_shared::{
    auth::{
        authorization::{can_assign_role, current_user, require_role},
        middleware::AuthContext,
    },
    messages::{BAD_CHOICE_ERROR, FORBIDDEN_ERROR},
    models::{
        role::{Role, UserStatus},
        user::{LimitedUser, User, UserEdit},
    },
};
use serde::Deserialize;
use std::str::FromStr;

/// Own profile update; empty fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSelfRequest {
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
}

/// Administrative edit; empty or missing fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub family: String,
    pub organization: String,
    pub team: String,
    pub role: String,
    pub status: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_choice<T: FromStr>(value: &str) -> ApiResult<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(BAD_CHOICE_ERROR.to_string()))
}

/// Builds the edit an administrator is allowed to make
///
/// Organization admins cannot change role, status or organization. Global
/// admins cannot grant a role above their own, nor change the role or status
/// of a user whose `current` role outranks theirs.
pub fn authorized_edit(actor: Role, current: Role, req: EditUserRequest) -> ApiResult<UserEdit> {
    let mut edit = UserEdit {
        email: req.email.trim().to_string(),
        first_name: non_empty(req.first_name),
        last_name: non_empty(req.last_name),
        family: non_empty(req.family).map(|family| family.to_uppercase()),
        organization: non_empty(req.organization),
        team: non_empty(req.team),
        role: parse_choice::<Role>(&req.role)?,
        status: parse_choice::<UserStatus>(&req.status)?,
    };

    if !actor.is_global_admin() {
        edit.role = None;
        edit.status = None;
        edit.organization = None;
    } else {
        let role_allowed = edit
            .role
            .map_or(true, |role| can_assign_role(actor, current, role));
        let status_allowed = edit.status.is_none() || actor >= current;

        if !role_allowed || !status_allowed {
            return Err(ApiError::Forbidden(FORBIDDEN_ERROR.to_string()));
        }
    }

    Ok(edit)
}

pub async fn update_self(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateSelfRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let mut user = current_user(&state.db, &auth).await?;

    if let Some(first_name) = non_empty(req.first_name) {
        user.first_name = first_name;
    }

    if let Some(last_name) = non_empty(req.last_name) {
        user.last_name = last_name;
    }

    // Changing organization drops any administrative role
    if let Some(organization) = non_empty(req.organization) {
        if user.organization.as_deref() != Some(organization.as_str()) {
            user.role = Role::User;
        }
        user.organization = Some(organization);
    }

    let user = user.save(&state.db).await?;
    tracing::info!(user_id = %user.id, "User profile updated");

    Ok(status("User profile updated successfully."))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<LimitedUser>>> {
    let admin = require_role(&state.db, &auth, Role::OrgAdmin).await?;
    let users = User::list_limited(&state.db, admin.admin_scope()).await?;

    Ok(Json(users))
}

/// Edits a user
///
/// # Errors
///
/// - `400 Bad Request`: Missing e-mail or an unknown role/status
/// - `403 Forbidden`: Granting a role above the caller's own, or changing
///   the role or status of a user ranked above the caller
/// - `404 Not Found`: No such user within the caller's reach
pub async fn edit(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<EditUserRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let admin = require_role(&state.db, &auth, Role::OrgAdmin).await?;

    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing information".to_string()));
    }

    let target = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let edit = authorized_edit(admin.role, target.role, req)?;

    let updated = User::apply_edit(&state.db, &edit, admin.admin_scope())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %updated.id,
        role = ?edit.role,
        status = ?edit.status,
        "User edited by administrator"
    );

    Ok(status("User successfully updated."))
}
