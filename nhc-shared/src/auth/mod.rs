/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: Session token generation and validation
/// - [`codes`]: One-time e-mail confirmation and password reset codes
/// - [`middleware`]: Request identity (`AuthContext`) and its extractor
/// - [`authorization`]: Role checks against the stored user
///
/// # Example
///
/// ```no_run
/// use nhc_shared::auth::password::{hash_password, verify_password};
/// use nhc_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4());
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod codes;
pub mod jwt;
pub mod middleware;
pub mod password;
