/// Initial data and startup integrity pass
///
/// With initialization enabled, the organization list and the commitment
/// catalog are reloaded from JSON files in the application directory and the
/// campaign settings are reset to their defaults:
///
/// - `organizations.json`: array of organization names
/// - `commitments.json`: array of `{name, links: [{url, title}], commitments}`
///
/// The integrity pass runs on every start and repairs data left behind by
/// older releases.

use serde::de::DeserializeOwned;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::commitment::Commitment;
use crate::models::globals::Globals;
use crate::models::organization::Organization;
use crate::models::participant::generate_scorecard;
use crate::models::user::User;

pub const ORGANIZATIONS_FILE: &str = "organizations.json";
pub const COMMITMENTS_FILE: &str = "commitments.json";

/// Error type for seeding and integrity checks
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of [`initialize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub organizations: u64,
    pub commitments: u64,
}

/// Outcome of [`check_integrity`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Legacy `pending` users moved to `registered`
    pub promoted_users: u64,

    /// Participants that received a missing scorecard
    pub repaired_participants: u64,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SeedError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the organization names from `dir`
pub fn load_organizations(dir: &Path) -> Result<Vec<String>, SeedError> {
    read_json(&dir.join(ORGANIZATIONS_FILE))
}

/// Reads the commitment catalog from `dir`
pub fn load_commitments(dir: &Path) -> Result<Vec<Commitment>, SeedError> {
    read_json(&dir.join(COMMITMENTS_FILE))
}

/// Reloads organizations and commitments and resets the campaign settings
///
/// Both files are parsed before anything is written, so a malformed file
/// leaves the database untouched.
pub async fn initialize(pool: &PgPool, dir: &Path) -> Result<SeedReport, SeedError> {
    let organizations = load_organizations(dir)?;
    let commitments = load_commitments(dir)?;

    let report = SeedReport {
        organizations: Organization::replace_all(pool, &organizations).await?,
        commitments: Commitment::replace_all(pool, &commitments).await?,
    };

    Globals::default().save(pool).await?;

    info!(
        dir = %dir.display(),
        organizations = report.organizations,
        commitments = report.commitments,
        "Initial data loaded"
    );

    Ok(report)
}

/// Repairs legacy statuses and missing scorecards
///
/// `challenge_length` sizes the scorecards generated for participants that
/// lack one.
pub async fn check_integrity(
    pool: &PgPool,
    challenge_length: u32,
) -> Result<IntegrityReport, SeedError> {
    let mut report = IntegrityReport {
        promoted_users: User::promote_pending(pool).await?,
        ..Default::default()
    };

    for mut user in User::find_missing_scorecards(pool).await? {
        for participant in user.participants.iter_mut() {
            if participant.scorecard.is_empty() {
                participant.scorecard = generate_scorecard(challenge_length);
                participant.points = 0;
                report.repaired_participants += 1;
            }
        }

        user.save(pool).await?;
    }

    info!(
        promoted_users = report.promoted_users,
        repaired_participants = report.repaired_participants,
        "Integrity check complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_seed_dir(organizations: &str, commitments: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nhc-seed-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ORGANIZATIONS_FILE), organizations).unwrap();
        std::fs::write(dir.join(COMMITMENTS_FILE), commitments).unwrap();
        dir
    }

    #[test]
    fn test_load_seed_files() {
        let dir = write_seed_dir(
            r#"["Acme Corp", "City Library"]"#,
            r#"[{"name": "Eat Breakfast", "commitments": ["Every day"]}]"#,
        );

        assert_eq!(load_organizations(&dir).unwrap(), vec!["Acme Corp", "City Library"]);

        let commitments = load_commitments(&dir).unwrap();
        assert_eq!(commitments[0].name, "Eat Breakfast");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let dir = std::env::temp_dir().join(format!("nhc-missing-{}", uuid::Uuid::new_v4()));

        let err = load_organizations(&dir).unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
        assert!(err.to_string().contains(ORGANIZATIONS_FILE));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = write_seed_dir(r#"{"not": "a list"}"#, "[]");

        assert!(matches!(
            load_organizations(&dir).unwrap_err(),
            SeedError::Parse { .. }
        ));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
