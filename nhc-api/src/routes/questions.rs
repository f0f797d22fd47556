/// Bonus questions
///
/// # Endpoints
///
/// - `GET    /api/bonus-question` - The enabled question, unless already answered
/// - `POST   /api/bonus-question` - `{ "answer": ... }`, once per user
/// - `GET    /api/admin/bonus-question` - Every question with its respondents
/// - `POST   /api/admin/bonus-question` - `{ "text", "answers", "correctAnswer" }`
/// - `DELETE /api/admin/bonus-question/:id`
/// - `PUT    /api/admin/bonus-question/:id/enable` - Enable one, disable the rest
/// - `PUT    /api/admin/bonus-question/disable` - Disable all

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{any_profane, status, StatusResponse},
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
    messages::{FORBIDDEN_ERROR, MISSING_FIELDS_ERROR, PROFANITY_ERROR},
    models::{
        question::{CreateQuestion, Question, Respondent},
        role::Role,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const CORRECT_ANSWER_STATUS: &str =
    "Your submission was received and you answered the question correctly.";
const INCORRECT_ANSWER_STATUS: &str =
    "Your submission was received but you answered the question incorrectly.";

/// Question as shown to participants, without the correct answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub text: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentQuestionResponse {
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
}

impl CurrentQuestionResponse {
    /// What `email` gets to see of the enabled question
    pub fn for_user(question: Option<Question>, email: &str) -> Self {
        match question {
            Some(question) if !question.has_responded(email) => Self {
                enabled: true,
                question: Some(QuestionView {
                    text: question.text,
                    answers: question.answers,
                }),
            },
            _ => Self {
                enabled: false,
                question: None,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQuestionRequest {
    pub text: String,
    pub answers: Vec<String>,
    pub correct_answer: String,
}

fn question_not_found() -> ApiError {
    ApiError::NotFound("Question not found.".to_string())
}

pub async fn current(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CurrentQuestionResponse>> {
    let user = current_user(&state.db, &auth).await?;
    let question = Question::find_enabled(&state.db).await?;

    Ok(Json(CurrentQuestionResponse::for_user(question, &user.email)))
}

/// Records the caller's answer to the enabled question
///
/// # Errors
///
/// - `403 Forbidden`: No question is enabled, or the caller already answered
pub async fn answer(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let user = current_user(&state.db, &auth).await?;
    let forbidden = || ApiError::Forbidden(FORBIDDEN_ERROR.to_string());

    let question = Question::find_enabled(&state.db)
        .await?
        .filter(|question| !question.has_responded(&user.email))
        .ok_or_else(forbidden)?;

    let answered_correctly = question.is_correct(&req.answer);
    let respondent = Respondent {
        user: user.email.clone(),
        answered_correctly,
    };

    // A concurrent submission may have won the race
    if !Question::add_respondent(&state.db, question.id, &respondent).await? {
        return Err(forbidden());
    }

    tracing::info!(user_id = %user.id, question_id = %question.id, answered_correctly, "Bonus question answered");

    Ok(status(if answered_correctly {
        CORRECT_ANSWER_STATUS
    } else {
        INCORRECT_ANSWER_STATUS
    }))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Question>>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;
    Ok(Json(Question::list(&state.db).await?))
}

/// Creates a question
///
/// # Errors
///
/// - `400 Bad Request`: Missing text, correct answer or answers, or profanity
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateQuestionRequest>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    let answers: Vec<String> = req
        .answers
        .iter()
        .map(|answer| answer.trim().to_string())
        .filter(|answer| !answer.is_empty())
        .collect();

    if req.text.trim().is_empty() || req.correct_answer.trim().is_empty() || answers.is_empty() {
        return Err(ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()));
    }

    let mut texts: Vec<&str> = vec![&req.text, &req.correct_answer];
    texts.extend(answers.iter().map(String::as_str));

    if any_profane(state.profanity.as_ref(), &texts).await {
        return Err(ApiError::BadRequest(PROFANITY_ERROR.to_string()));
    }

    let question = Question::create(
        &state.db,
        CreateQuestion {
            text: req.text.trim().to_string(),
            correct_answer: req.correct_answer.trim().to_string(),
            answers,
        },
    )
    .await?;
    tracing::info!(question_id = %question.id, "Bonus question created");

    Ok(status("Question successfully created."))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if !Question::delete(&state.db, id).await? {
        return Err(question_not_found());
    }

    Ok(status("Question deleted."))
}

pub async fn enable(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    if !Question::enable(&state.db, id).await? {
        return Err(question_not_found());
    }

    Ok(status("Question enabled."))
}

pub async fn disable(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<StatusResponse>> {
    require_role(&state.db, &auth, Role::GlobalAdmin).await?;

    Question::disable_all(&state.db).await?;

    Ok(status("Question disabled."))
}
