/// Family codes
///
/// Related accounts share a family code so their progress can be grouped. A
/// code is the uppercased last name with whitespace removed followed by four
/// random digits, e.g. `LOVELACE0427`. Codes are unique; generation retries
/// until an unused code is inserted.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Attempts before giving up on finding a free code
pub const MAX_CODE_ATTEMPTS: usize = 100;

/// Stored family code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Family {
    pub id: Uuid,
    pub code: String,
}

/// Error type for family code generation
#[derive(Debug, thiserror::Error)]
pub enum FamilyError {
    /// Every attempted code was already taken
    #[error("Could not find an unused family code after {0} attempts")]
    Exhausted(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Builds one candidate code for `last_name`
///
/// # Example
///
/// ```
/// use nhc_shared::models::family::candidate_code;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let code = candidate_code("van Dyke", &mut StdRng::seed_from_u64(7));
/// assert!(code.starts_with("VANDYKE"));
/// assert_eq!(code.len(), "VANDYKE".len() + 4);
/// ```
pub fn candidate_code<R: Rng + ?Sized>(last_name: &str, rng: &mut R) -> String {
    let prefix: String = last_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    format!("{}{:04}", prefix, rng.gen_range(0..10_000))
}

impl Family {
    /// Generates and stores a new unique family code
    pub async fn create_unique(pool: &PgPool, last_name: &str) -> Result<Self, FamilyError> {
        let mut rng = StdRng::from_entropy();
        Self::create_unique_with(pool, last_name, &mut rng).await
    }

    /// Generates and stores a new unique family code using `rng`
    ///
    /// # Errors
    ///
    /// `FamilyError::Exhausted` after [`MAX_CODE_ATTEMPTS`] collisions
    pub async fn create_unique_with<R: Rng + Send>(
        pool: &PgPool,
        last_name: &str,
        rng: &mut R,
    ) -> Result<Self, FamilyError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = candidate_code(last_name, rng);

            let inserted = sqlx::query_as::<_, Family>(
                r#"
                INSERT INTO families (code)
                VALUES ($1)
                ON CONFLICT (code) DO NOTHING
                RETURNING id, code
                "#,
            )
            .bind(&code)
            .fetch_optional(pool)
            .await?;

            if let Some(family) = inserted {
                return Ok(family);
            }

            tracing::debug!(code = %code, attempt, "Family code taken, retrying");
        }

        Err(FamilyError::Exhausted(MAX_CODE_ATTEMPTS))
    }

    /// Checks whether a family code exists (case-insensitive)
    pub async fn exists(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM families WHERE code = $1)")
            .bind(code.trim().to_uppercase())
            .fetch_one(pool)
            .await
    }
}
