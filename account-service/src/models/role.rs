//! Roles are seeded reference data; this service only looks them up and
//! assigns them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Role granted to whoever registers an organization.
pub const ADMIN_ROLE: &str = "Admin";
/// Role granted to members added to an existing organization.
pub const MEMBER_ROLE: &str = "Caregiver";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleScope {
    Platform,
    Organization,
}

impl RoleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleScope::Platform => "PLATFORM",
            RoleScope::Organization => "ORGANIZATION",
        }
    }
}

/// Roles installed by the seed migration.
pub const SEEDED_ROLES: &[(RoleScope, &str)] = &[
    (RoleScope::Platform, "SuperAdmin"),
    (RoleScope::Platform, "SystemAdmin"),
    (RoleScope::Platform, "Moderator"),
    (RoleScope::Platform, "Viewer"),
    (RoleScope::Organization, "Admin"),
    (RoleScope::Organization, "Manager"),
    (RoleScope::Organization, "Caregiver"),
    (RoleScope::Organization, "Viewer"),
];

/// Role entity, unique per (scope, name).
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub scope: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(scope: RoleScope, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope: scope.as_str().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Grants a role to a user, optionally within an organization.
#[derive(Debug, Clone, FromRow)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(user_id: Uuid, role_id: Uuid, organization_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_id,
            organization_id,
            created_at: Utc::now(),
        }
    }
}
