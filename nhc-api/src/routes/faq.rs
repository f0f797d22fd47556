/// Frequently asked questions
///
/// # Endpoints
///
/// - `GET    /api/faq` - Public list
/// - `POST   /api/admin/faq` - `{ "question", "answer", "category" }`
/// - `PUT    /api/admin/faq` - `{ "id", "question", "answer", "category" }`
/// - `DELETE /api/admin/faq/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{any_blank, status, StatusResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use nhc_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    messages::MISSING_FIELDS_ERROR,
    models::{faq::Faq, role::Role},
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FaqRequest {
    pub id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub category: String,
}

impl FaqRequest {
    fn check_fields(&self) -> ApiResult<()> {
        if any_blank(&[&self.question, &self.answer, &self.category]) {
            return Err(ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()));
        }
        Ok(())
    }
}

fn faq_not_found() -> ApiError {
    ApiError::NotFound("FAQ not found.".to_string())
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Faq>>> {
    Ok(Json(Faq::list(&state.db).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<FaqRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;
    req.check_fields()?;

    let faq = Faq::create(
        &state.db,
        req.question.trim(),
        req.answer.trim(),
        req.category.trim(),
    )
    .await?;
    tracing::info!(faq_id = %faq.id, "FAQ added");

    Ok(status("FAQ successfully added."))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<FaqRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    let id = req
        .id
        .ok_or_else(|| ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()))?;
    req.check_fields()?;

    let faq = Faq {
        id,
        question: req.question.trim().to_string(),
        answer: req.answer.trim().to_string(),
        category: req.category.trim().to_string(),
    };

    faq.update(&state.db).await?.ok_or_else(faq_not_found)?;

    Ok(status("FAQ updated."))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if !Faq::delete(&state.db, id).await? {
        return Err(faq_not_found());
    }

    Ok(status("FAQ deleted."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let req: FaqRequest = serde_json::from_str(
            r#"{"question": "When does it start?", "answer": "February 1st", "category": "General"}"#,
        )
        .unwrap();
        assert!(req.check_fields().is_ok());
        assert!(req.id.is_none());

        let req: FaqRequest = serde_json::from_str(r#"{"question": "When?", "answer": ""}"#).unwrap();
        assert!(matches!(req.check_fields(), Err(ApiError::BadRequest(_))));
    }
}
