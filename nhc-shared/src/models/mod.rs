/// Database models for the NHC backend
///
/// Each model is a plain struct with associated async functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `user`: Accounts, profile, linked identities and participants
/// - `role`: Role hierarchy and account statuses
/// - `participant`: Participants and scorecard arithmetic
/// - `organization`: Organizations and their cascades onto users
/// - `family`: Unique family codes
/// - `commitment`: Static commitment catalog
/// - `news`: Announcements
/// - `faq`: Frequently asked questions
/// - `question`: Bonus trivia questions
/// - `globals`: Challenge window and feature switches
///
/// # Example
///
/// ```no_run
/// use nhc_shared::models::organization::Organization;
/// use nhc_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// Organization::create_if_absent(&pool, "Acme Corp", false).await?;
/// let organizations = Organization::list(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod commitment;
pub mod family;
pub mod faq;
pub mod globals;
pub mod news;
pub mod organization;
pub mod participant;
pub mod question;
pub mod role;
pub mod user;
