/// User roles and account statuses
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM (
///     'user', 'org_admin', 'org_super_admin', 'global_admin', 'global_super_admin'
/// );
/// CREATE TYPE user_status AS ENUM ('unconfirmed', 'unregistered', 'registered', 'pending');
/// ```
///
/// # Role Hierarchy
///
/// `User < OrgAdmin < OrgSuperAdmin < GlobalAdmin < GlobalSuperAdmin`
///
/// A role satisfies a requirement when it sits at or above the required role,
/// so a `global_super_admin` passes every `global_admin` check.

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use std::fmt;
use std::str::FromStr;

/// Role of a user account, ordered from least to most privileged
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular participant
    #[default]
    User,

    /// Manages users of their own organization
    OrgAdmin,

    /// Senior organization administrator
    OrgSuperAdmin,

    /// Manages the whole campaign
    GlobalAdmin,

    /// Highest privilege
    GlobalSuperAdmin,
}

impl Role {
    /// Every role, lowest first
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::OrgAdmin,
        Role::OrgSuperAdmin,
        Role::GlobalAdmin,
        Role::GlobalSuperAdmin,
    ];

    /// Roles an organization administrator may address in bulk messages
    pub const ORGANIZATION_ROLES: [Role; 3] = [Role::User, Role::OrgAdmin, Role::OrgSuperAdmin];

    /// Converts role to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::OrgAdmin => "org_admin",
            Role::OrgSuperAdmin => "org_super_admin",
            Role::GlobalAdmin => "global_admin",
            Role::GlobalSuperAdmin => "global_super_admin",
        }
    }

    /// Checks if this role meets the required role
    pub fn has_permission(&self, required: Role) -> bool {
        *self >= required
    }

    /// Any administrator, organization or global
    pub fn is_admin(&self) -> bool {
        self.has_permission(Role::OrgAdmin)
    }

    /// Global administrators see and manage every organization
    pub fn is_global_admin(&self) -> bool {
        self.has_permission(Role::GlobalAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PgHasArrayType for Role {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_user_role")
    }
}

/// Error returned when parsing an unknown role or status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown value: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Lifecycle status of a user account
///
/// `unconfirmed` accounts have not verified their e-mail address yet,
/// `unregistered` accounts are verified but have not registered for the
/// challenge, `registered` accounts are taking part. `pending` is a legacy
/// status that the startup integrity pass converts to `registered`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Unconfirmed,
    Unregistered,
    Registered,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Unconfirmed => "unconfirmed",
            UserStatus::Unregistered => "unregistered",
            UserStatus::Registered => "registered",
            UserStatus::Pending => "pending",
        }
    }
}

impl PgHasArrayType for UserStatus {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_user_status")
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            UserStatus::Unconfirmed,
            UserStatus::Unregistered,
            UserStatus::Registered,
            UserStatus::Pending,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}
