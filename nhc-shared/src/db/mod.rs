/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded schema migrations
/// - `seed`: Initial data loading and the startup integrity pass
/// - Models are in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use nhc_shared::db::pool::{create_pool, DatabaseConfig};
/// use nhc_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_url(std::env::var("DATABASE_URL")?, 10);
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
pub mod seed;
