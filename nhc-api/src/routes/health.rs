/// Health check endpoint
///
/// Reports whether the database answers and how the mail queue is doing.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "mail": { "sent": 12, "failed": 0, "rejected": 0 }
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use nhc_shared::{db::pool::health_check as ping_database, mail::dispatcher::DispatcherStats};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,

    /// Application version
    pub version: &'static str,

    /// Database status
    pub database: &'static str,

    /// Mail delivery counters since startup
    pub mail: DispatcherStats,
}

/// Health check handler
///
/// Answers 503 with status `degraded` when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match ping_database(&state.db).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the database");
            false
        }
    };

    let code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: if connected { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database: if connected { "connected" } else { "disconnected" },
            mail: state.mailer.stats(),
        }),
    )
}
