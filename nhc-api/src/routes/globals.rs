/// Campaign settings and the commitment catalog
///
/// # Endpoints
///
/// - `GET  /api/globals` - Current settings (served from memory)
/// - `POST /api/globals` - Replace the settings; the challenge length is recomputed
/// - `GET  /api/commitments` - Commitment catalog
///
/// Dates are accepted as `2017-01-16` or as RFC 3339 timestamps
/// (`2017-01-16T00:00:00Z`), in which case only the date part is kept.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate};
use nhc_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        commitment::Commitment,
        globals::Globals,
        role::Role,
    },
};
use serde::{de, Deserialize, Deserializer};

/// Settings update; `challengeLength` is derived and ignored if sent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalsRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub challenge_start: NaiveDate,

    #[serde(deserialize_with = "deserialize_date")]
    pub challenge_end: NaiveDate,

    #[serde(default)]
    pub registration_open: bool,

    #[serde(default)]
    pub scorecard_enabled: bool,
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_date(&value).ok_or_else(|| de::Error::custom(format!("invalid date {:?}", value)))
}

pub async fn get_globals(State(state): State<AppState>) -> Json<Globals> {
    let globals = state.globals.snapshot().await;
    Json(Globals::clone(&globals))
}

/// Replaces the settings and publishes them to every request
///
/// # Errors
///
/// - `400 Bad Request`: The challenge ends before it starts or runs longer
///   than a year
pub async fn update_globals(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<GlobalsRequest>,
) -> ApiResult<Json<Globals>> {
    let admin = require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    let globals = Globals::new(
        req.challenge_start,
        req.challenge_end,
        req.registration_open,
        req.scorecard_enabled,
    )?;

    let updated = state.globals.update(&state.db, globals).await?;

    tracing::info!(
        admin_id = %admin.id,
        start = %updated.challenge_start,
        end = %updated.challenge_end,
        length = updated.challenge_length,
        registration_open = updated.registration_open,
        scorecard_enabled = updated.scorecard_enabled,
        "Campaign settings updated"
    );

    Ok(Json(Globals::clone(&updated)))
}

pub async fn list_commitments(State(state): State<AppState>) -> ApiResult<Json<Vec<Commitment>>> {
    Ok(Json(Commitment::list(&state.db).await?))
}
