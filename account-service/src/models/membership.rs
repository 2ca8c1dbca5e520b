//! OrganizationUser model - one row per (user, organization).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Active,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "ACTIVE",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub status: String,
    pub invited_by_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Create an ACTIVE membership joined now.
    pub fn active(user_id: Uuid, organization_id: Uuid, invited_by_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            status: MembershipStatus::Active.as_str().to_string(),
            invited_by_id,
            joined_at: Utc::now(),
        }
    }
}

/// A membership row together with its user.
#[derive(Debug, Clone)]
pub struct Member {
    pub membership: Membership,
    pub user: User,
}
