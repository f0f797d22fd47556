/// Bulk e-mail from administrators
///
/// # Endpoint
///
/// ```text
/// POST /api/admin/message
///
/// {
///   "status": ["registered"],
///   "roles": ["user", "org_admin"],
///   "subject": "Week 2",
///   "body": "Keep it up!"
/// }
/// ```
///
/// Global admins choose the roles to address. Organization admins always
/// address their own organization's users and organization admins; any
/// `roles` they send are ignored.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{status, StatusResponse},
};
use axum::{extract::State, Json};
use nhc_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    messages::BAD_MESSAGE_ERROR,
    models::{
        role::{Role, UserStatus},
        user::User,
    },
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageRequest {
    pub status: Vec<UserStatus>,
    pub roles: Vec<Role>,
    pub subject: String,
    pub body: String,
}

/// Recipient filter for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience {
    pub statuses: Vec<UserStatus>,
    pub roles: Vec<Role>,
    pub organization: Option<String>,
}

/// Works out who `sender` may address with `req`
///
/// # Errors
///
/// `400 Bad Request` with [`BAD_MESSAGE_ERROR`] when the status selector,
/// subject or body is empty, or a global admin sent no roles
pub fn audience(sender: &User, req: &MessageRequest) -> ApiResult<Audience> {
    let bad_message = || ApiError::BadRequest(BAD_MESSAGE_ERROR.to_string());

    if req.status.is_empty() || req.subject.trim().is_empty() || req.body.trim().is_empty() {
        return Err(bad_message());
    }

    match sender.admin_scope() {
        None => {
            if req.roles.is_empty() {
                return Err(bad_message());
            }

            Ok(Audience {
                statuses: req.status.clone(),
                roles: req.roles.clone(),
                organization: None,
            })
        }
        Some(organization) => Ok(Audience {
            statuses: req.status.clone(),
            roles: Role::ORGANIZATION_ROLES.to_vec(),
            organization: Some(organization.to_string()),
        }),
    }
}

pub async fn send(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<MessageRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let sender = require_role(&state.db, &auth, Role::OrgAdmin).await?;
    let audience = audience(&sender, &req)?;

    let recipients = User::find_recipients(
        &state.db,
        &audience.statuses,
        &audience.roles,
        audience.organization.as_deref(),
    )
    .await?;

    tracing::info!(
        sender_id = %sender.id,
        recipients = recipients.len(),
        organization = ?audience.organization,
        "Sending bulk message"
    );

    if !recipients.is_empty() {
        let mails = state.templates.admin_message(&recipients, req.subject.trim(), &req.body);

        state.mailer.send_bulk(mails).map_err(|err| {
            tracing::error!(error = %err, "Failed to queue bulk message");
            ApiError::ServiceUnavailable(
                "The mail queue is busy. Please try again later.".to_string(),
            )
        })?;
    }

    Ok(status("Messages sent."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json as SqlJson;
    use uuid::Uuid;

    fn sender(role: Role, organization: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            password_hash: None,
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            family: None,
            organization: organization.map(str::to_string),
            team: None,
            sharing: String::new(),
            comment: String::new(),
            referral: String::new(),
            donation: String::new(),
            picture: String::new(),
            facebook: None,
            google: None,
            role,
            status: UserStatus::Registered,
            participants: SqlJson(Vec::new()),
            code_hash: None,
            reset_code_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn request(roles: Vec<Role>) -> MessageRequest {
        MessageRequest {
            status: vec![UserStatus::Registered],
            roles,
            subject: "Week 2".to_string(),
            body: "Keep it up!".to_string(),
        }
    }

    #[test]
    fn test_global_admin_must_choose_roles() {
        let admin = sender(Role::GlobalAdmin, None);

        assert!(matches!(
            audience(&admin, &request(Vec::new())),
            Err(ApiError::BadRequest(ref msg)) if msg == BAD_MESSAGE_ERROR
        ));

        let audience = audience(&admin, &request(vec![Role::User])).unwrap();
        assert_eq!(audience.roles, vec![Role::User]);
        assert!(audience.organization.is_none());
    }

    #[test]
    fn test_org_admin_is_limited_to_organization() {
        let admin = sender(Role::OrgSuperAdmin, Some("Acme"));
        let audience = audience(&admin, &request(vec![Role::GlobalSuperAdmin])).unwrap();

        assert_eq!(audience.organization.as_deref(), Some("Acme"));
        assert_eq!(audience.roles, Role::ORGANIZATION_ROLES.to_vec());
    }

    #[test]
    fn test_missing_fields_rejected() {
        let admin = sender(Role::GlobalAdmin, None);

        let mut req = request(vec![Role::User]);
        req.subject = " ".to_string();
        assert!(audience(&admin, &req).is_err());

        let mut req = request(vec![Role::User]);
        req.status.clear();
        assert!(audience(&admin, &req).is_err());
    }

    #[test]
    fn test_request_parses_wire_names() {
        let req: MessageRequest = serde_json::from_str(
            r#"{"status": ["registered", "unregistered"], "roles": ["org_admin"], "subject": "Hi", "body": "There"}"#,
        )
        .unwrap();

        assert_eq!(req.status, vec![UserStatus::Registered, UserStatus::Unregistered]);
        assert_eq!(req.roles, vec![Role::OrgAdmin]);
    }
}
