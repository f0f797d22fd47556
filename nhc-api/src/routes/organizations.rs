/// Organizations
///
/// Users reference their organization by name, so rename, delete and merge
/// carry the change over to every member.
///
/// # Endpoints
///
/// - `GET    /api/organizations` - Public list
/// - `POST   /api/admin/organizations` - `{ "name": ... }`
/// - `PUT    /api/admin/organizations` - `{ "id": ..., "name": ... }`
/// - `DELETE /api/admin/organizations/:id`
/// - `POST   /api/admin/organizations/merge` - `{ "organizations": [{ "id", "name" }], "newName": ... }`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{status, StatusResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use nhc_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    messages::MISSING_FIELDS_ERROR,
    models::{organization::Organization, role::Role},
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationRequest {
    pub id: Option<Uuid>,
    pub name: String,
}

/// Organization reference inside a merge request
#[derive(Debug, Deserialize)]
pub struct OrganizationRef {
    pub id: Uuid,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeRequest {
    pub organizations: Vec<OrganizationRef>,
    pub new_name: String,
}

fn organization_not_found() -> ApiError {
    ApiError::NotFound("Organization not found.".to_string())
}

fn required_name(name: &str) -> ApiResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()));
    }
    Ok(name)
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(Organization::list(&state.db).await?))
}

/// Adds an approved organization
///
/// # Errors
///
/// - `409 Conflict`: The name is taken
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<OrganizationRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;
    let name = required_name(&req.name)?;

    let organization = Organization::create(&state.db, name, false).await?;
    tracing::info!(organization_id = %organization.id, name = %organization.name, "Organization added");

    Ok(status("Organization added."))
}

pub async fn rename(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<OrganizationRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    let id = req
        .id
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()))?;
    let name = required_name(&req.name)?;

    Organization::rename(&state.db, id, name)
        .await?
        .ok_or_else(organization_not_found)?;

    Ok(status("Organization updated."))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if !Organization::delete(&state.db, id).await? {
        return Err(organization_not_found());
    }

    Ok(status("Organization deleted."))
}

/// Merges organizations into the first listed one
///
/// # Errors
///
/// - `400 Bad Request`: No organizations listed, or no new name
/// - `404 Not Found`: None of the listed organizations exist
pub async fn merge(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<MergeRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if req.organizations.is_empty() {
        return Err(ApiError::BadRequest(
            "Merge organizations request missing organizations.".to_string(),
        ));
    }
    let new_name = required_name(&req.new_name)?;

    let ids: Vec<Uuid> = req.organizations.iter().map(|org| org.id).collect();

    Organization::merge(&state.db, &ids, new_name)
        .await?
        .ok_or_else(organization_not_found)?;

    Ok(status("Organizations successfully merged."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_request_parses() {
        let req: MergeRequest = serde_json::from_str(
            r#"{
                "organizations": [
                    {"id": "8a1f1f0e-6c5b-4b8e-9c43-1f1f1f1f1f1f", "name": "Acme"},
                    {"id": "0b5e2a7c-3d4f-4a1b-8c9d-2e2e2e2e2e2e"}
                ],
                "newName": "Acme Corp"
            }"#,
        )
        .unwrap();

        assert_eq!(req.organizations.len(), 2);
        assert_eq!(req.organizations[0].name, "Acme");
        assert_eq!(req.new_name, "Acme Corp");
    }

    #[test]
    fn test_required_name() {
        assert_eq!(required_name("  Acme ").unwrap(), "Acme");
        assert!(matches!(
            required_name(" "),
            Err(ApiError::BadRequest(ref msg)) if msg == MISSING_FIELDS_ERROR
        ));
    }
}
