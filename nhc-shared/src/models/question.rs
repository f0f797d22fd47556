/// Bonus questions
///
/// Administrators create multiple-choice trivia questions; at most one is
/// enabled at a time (enforced by a partial unique index). Each user may
/// answer the enabled question once; answers are recorded as respondents
/// on the question row.

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

const QUESTION_COLUMNS: &str = "id, text, answers, correct_answer, enabled, respondents";

/// Recorded answer of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Respondent {
    /// E-mail of the answering user
    pub user: String,

    pub answered_correctly: bool,
}

/// Bonus question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,

    pub text: String,

    pub answers: Vec<String>,

    pub correct_answer: String,

    pub enabled: bool,

    pub respondents: Json<Vec<Respondent>>,
}

/// Input for creating a question
#[derive(Debug, Clone, Default)]
pub struct CreateQuestion {
    pub text: String,
    pub answers: Vec<String>,
    pub correct_answer: String,
}

impl Question {
    /// Whether `email` has already answered this question
    pub fn has_responded(&self, email: &str) -> bool {
        self.respondents
            .iter()
            .any(|respondent| respondent.user.eq_ignore_ascii_case(email))
    }

    /// Whether `answer` matches the correct answer
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer.trim() == answer.trim()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at DESC");

        sqlx::query_as::<_, Question>(&query).fetch_all(pool).await
    }

    pub async fn create(pool: &PgPool, data: CreateQuestion) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO questions (text, answers, correct_answer)
            VALUES ($1, $2, $3)
            RETURNING {QUESTION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Question>(&query)
            .bind(data.text)
            .bind(data.answers)
            .bind(data.correct_answer)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The currently enabled question, if any
    pub async fn find_enabled(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE enabled LIMIT 1");

        sqlx::query_as::<_, Question>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Enables one question and disables every other
    ///
    /// # Returns
    ///
    /// `false` if the question does not exist, in which case nothing changes
    pub async fn enable(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE questions SET enabled = FALSE WHERE enabled")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE questions SET enabled = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Disables every question
    pub async fn disable_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE questions SET enabled = FALSE WHERE enabled")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Records an answer unless the user already answered
    ///
    /// The check and the append happen in one statement, so concurrent
    /// submissions from the same user record at most one answer.
    ///
    /// # Returns
    ///
    /// `true` if the answer was recorded
    pub async fn add_respondent(
        pool: &PgPool,
        id: Uuid,
        respondent: &Respondent,
    ) -> Result<bool, sqlx::Error> {
        let entry = Json(vec![respondent.clone()]);
        let probe = Json(serde_json::json!([{ "user": respondent.user }]));

        let result = sqlx::query(
            r#"
            UPDATE questions
            SET respondents = respondents || $2::jsonb
            WHERE id = $1 AND NOT respondents @> $3::jsonb
            "#,
        )
        .bind(id)
        .bind(entry)
        .bind(probe)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
