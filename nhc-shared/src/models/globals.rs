/// Campaign-wide settings
///
/// A single row holding the challenge window and feature switches. The API
/// keeps a copy in memory (see `GlobalsCache`) that is replaced after every
/// successful update, so reads never hit the database.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE globals (
///     id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
///     challenge_start DATE NOT NULL,
///     challenge_end DATE NOT NULL,
///     challenge_length INTEGER NOT NULL,
///     registration_open BOOLEAN NOT NULL DEFAULT TRUE,
///     scorecard_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (challenge_end >= challenge_start)
/// );
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Challenge window and feature switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Globals {
    pub challenge_start: NaiveDate,

    pub challenge_end: NaiveDate,

    /// Days in the challenge, both ends inclusive
    pub challenge_length: i32,

    pub registration_open: bool,

    pub scorecard_enabled: bool,
}

/// Longest accepted challenge, in days
pub const MAX_CHALLENGE_DAYS: i32 = 366;

/// Error returned for an inconsistent settings update
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidWindow {
    #[error("Challenge end {end} is before challenge start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("Challenge of {days} days is longer than the {max} day maximum")]
    TooLong { days: i32, max: i32 },
}

impl Default for Globals {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2016, 2, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2016, 2, 29).unwrap_or_default();

        Globals {
            challenge_start: start,
            challenge_end: end,
            challenge_length: challenge_length(start, end),
            registration_open: true,
            scorecard_enabled: false,
        }
    }
}

/// Number of days from `start` to `end`, both inclusive
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use nhc_shared::models::globals::challenge_length;
///
/// let start = NaiveDate::from_ymd_opt(2016, 12, 20).unwrap();
/// let end = NaiveDate::from_ymd_opt(2017, 1, 16).unwrap();
/// assert_eq!(challenge_length(start, end), 28);
/// ```
pub fn challenge_length(start: NaiveDate, end: NaiveDate) -> i32 {
    let days = (end - start).num_days() + 1;
    i32::try_from(days).unwrap_or(i32::MAX)
}

impl Globals {
    /// Builds settings from a submitted window, deriving the length
    ///
    /// # Errors
    ///
    /// `InvalidWindow` if the end date precedes the start date or the window
    /// spans more than [`MAX_CHALLENGE_DAYS`]
    pub fn new(
        challenge_start: NaiveDate,
        challenge_end: NaiveDate,
        registration_open: bool,
        scorecard_enabled: bool,
    ) -> Result<Self, InvalidWindow> {
        if challenge_end < challenge_start {
            return Err(InvalidWindow::EndBeforeStart {
                start: challenge_start,
                end: challenge_end,
            });
        }

        let days = challenge_length(challenge_start, challenge_end);
        if days > MAX_CHALLENGE_DAYS {
            return Err(InvalidWindow::TooLong {
                days,
                max: MAX_CHALLENGE_DAYS,
            });
        }

        Ok(Globals {
            challenge_start,
            challenge_end,
            challenge_length: days,
            registration_open,
            scorecard_enabled,
        })
    }

    /// Challenge length as an unsigned day count
    pub fn length_days(&self) -> u32 {
        u32::try_from(self.challenge_length).unwrap_or(0)
    }

    /// Loads the settings row, inserting the defaults if it is missing
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let existing = sqlx::query_as::<_, Globals>(
            r#"
            SELECT challenge_start, challenge_end, challenge_length,
                   registration_open, scorecard_enabled
            FROM globals
            WHERE id = 1
            "#,
        )
        .fetch_optional(pool)
        .await?;

        match existing {
            Some(globals) => Ok(globals),
            None => {
                let defaults = Globals::default();
                defaults.save(pool).await?;
                Ok(defaults)
            }
        }
    }

    /// Writes the settings row
    pub async fn save(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO globals (id, challenge_start, challenge_end, challenge_length,
                                 registration_open, scorecard_enabled)
            VALUES (1, $1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET challenge_start = EXCLUDED.challenge_start,
                challenge_end = EXCLUDED.challenge_end,
                challenge_length = EXCLUDED.challenge_length,
                registration_open = EXCLUDED.registration_open,
                scorecard_enabled = EXCLUDED.scorecard_enabled,
                updated_at = NOW()
            "#,
        )
        .bind(self.challenge_start)
        .bind(self.challenge_end)
        .bind(self.challenge_length)
        .bind(self.registration_open)
        .bind(self.scorecard_enabled)
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// In-memory copy of [`Globals`]
///
/// Readers take a cheap snapshot; writers persist first and swap the snapshot
/// only after the database write succeeded.
#[derive(Debug, Clone, Default)]
pub struct GlobalsCache {
    inner: Arc<RwLock<Arc<Globals>>>,
}

impl GlobalsCache {
    pub fn new(globals: Globals) -> Self {
        GlobalsCache {
            inner: Arc::new(RwLock::new(Arc::new(globals))),
        }
    }

    /// Current settings
    pub async fn snapshot(&self) -> Arc<Globals> {
        self.inner.read().await.clone()
    }

    /// Persists `globals` and publishes it to readers
    pub async fn update(&self, pool: &PgPool, globals: Globals) -> Result<Arc<Globals>, sqlx::Error> {
        // Holding the write lock across the save serializes concurrent updates
        let mut guard = self.inner.write().await;
        globals.save(pool).await?;

        let updated = Arc::new(globals);
        *guard = updated.clone();

        Ok(updated)
    }

    /// Replaces the cached settings without touching the database
    pub async fn replace(&self, globals: Globals) {
        *self.inner.write().await = Arc::new(globals);
    }
}
