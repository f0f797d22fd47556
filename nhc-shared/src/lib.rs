//! # NHC Shared Library
//!
//! This crate contains the data access layer and business logic behind the
//! Nutrition Habit Challenge API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Session tokens, password hashing, request identity and role checks
//! - `db`: Connection pool, migrations, seeding and integrity checks
//! - `identity`: Facebook and Google OAuth2 sign-in
//! - `registration`: Challenge registration workflow
//! - `mail`: Outgoing e-mail templates and the delivery queue
//! - `profanity`: Profanity filter used by user-facing forms
//! - `messages`: User-facing message constants

pub mod auth;
pub mod db;
pub mod identity;
pub mod mail;
pub mod messages;
pub mod models;
pub mod profanity;
pub mod registration;

/// Current version of the NHC shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
