/// News items
///
/// # Endpoints
///
/// - `GET    /api/news` - Published items; administrators also see admin-only items
/// - `GET    /api/admin/news` - Every item
/// - `POST   /api/admin/news` - `{ "subject", "body", "published", "adminOnly" }`
/// - `DELETE /api/admin/news/:id`
/// - `PUT    /api/admin/news/:id/publish`, `/unpublish`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{any_blank, any_profane, status, StatusResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use nhc_shared::{
    auth::{
        authorization::{current_user, require_role},
        middleware::AuthContext,
    },
    messages::{MISSING_FIELDS_ERROR, PROFANITY_ERROR},
    models::{
        news::{CreateNews, News},
        role::Role,
    },
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateNewsRequest {
    pub subject: String,
    pub body: String,
    pub published: bool,
    pub admin_only: bool,
}

fn news_not_found() -> ApiError {
    ApiError::NotFound("News item not found.".to_string())
}

pub async fn list_published(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<News>>> {
    let user = current_user(&state.db, &auth).await?;
    let news = News::list_published(&state.db, user.role.is_admin()).await?;

    Ok(Json(news))
}

pub async fn list_all(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<News>>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;
    Ok(Json(News::list_all(&state.db).await?))
}

/// Adds a news item
///
/// # Errors
///
/// - `400 Bad Request`: Missing subject or body, or profanity
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateNewsRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let admin = require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if any_blank(&[&req.subject, &req.body]) {
        return Err(ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()));
    }

    if any_profane(state.profanity.as_ref(), &[&req.subject, &req.body]).await {
        return Err(ApiError::BadRequest(PROFANITY_ERROR.to_string()));
    }

    let news = News::create(
        &state.db,
        CreateNews {
            subject: req.subject.trim().to_string(),
            body: req.body,
            published: req.published,
            admin_only: req.admin_only,
        },
    )
    .await?;

    tracing::info!(admin_id = %admin.id, news_id = %news.id, published = news.published, "News item added");

    Ok(status("Saved new item successfully."))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if !News::delete(&state.db, id).await? {
        return Err(news_not_found());
    }

    Ok(status("News item deleted."))
}

pub async fn publish(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    News::set_published(&state.db, id, true)
        .await?
        .ok_or_else(news_not_found)?;

    Ok(status("News item published."))
}

pub async fn unpublish(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    News::set_published(&state.db, id, false)
        .await?
        .ok_or_else(news_not_found)?;

    Ok(status("News item unpublished."))
}
