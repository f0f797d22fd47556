/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Local accounts, sessions, e-mail verification and password reset
/// - `oauth`: Facebook and Google sign-in
/// - `registration`: Challenge registration
/// - `participants`: Participants and scorecards
/// - `users`: Profile updates and user administration
/// - `messages`: Bulk e-mail to users
/// - `organizations`, `news`, `faq`, `questions`: Campaign content
/// - `globals`: Campaign settings and the commitment catalog

pub mod auth;
pub mod faq;
pub mod globals;
pub mod health;
pub mod messages;
pub mod news;
pub mod oauth;
pub mod organizations;
pub mod participants;
pub mod questions;
pub mod registration;
pub mod users;

use axum::Json;
use nhc_shared::profanity::ProfanityFilter;
use serde::{Deserialize, Serialize};

/// Acknowledgement returned by handlers that change state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Builds a `{"status": ...}` body
pub fn status(message: impl Into<String>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: message.into(),
    })
}

/// Session token issued on login, signup, verification and OAuth sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// True when any of `values` is blank
pub(crate) fn any_blank(values: &[&str]) -> bool {
    values.iter().any(|value| value.trim().is_empty())
}

/// True when the filter flags any non-empty value
pub(crate) async fn any_profane(filter: &dyn ProfanityFilter, values: &[&str]) -> bool {
    for value in values {
        if !value.trim().is_empty() && filter.is_profane(value).await {
            return true;
        }
    }
    false
}
