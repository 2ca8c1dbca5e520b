//! User model - global accounts, unique by normalized email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User lifecycle. An invited user has no credential until registration
/// completes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Invited,
    Active,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Invited => "invited",
            UserState::Active => "active",
        }
    }
}

impl std::str::FromStr for UserState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invited" => Ok(UserState::Invited),
            "active" => Ok(UserState::Active),
            _ => Err(format!("Invalid user state: {}", s)),
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create an active user holding a credential.
    pub fn active(
        email: String,
        first_name: String,
        last_name: String,
        password_hash: String,
    ) -> Self {
        Self::build(
            email,
            first_name,
            last_name,
            Some(password_hash),
            UserState::Active,
        )
    }

    /// Create an invited placeholder without a credential.
    pub fn invited(email: String, first_name: String, last_name: String) -> Self {
        Self::build(email, first_name, last_name, None, UserState::Invited)
    }

    fn build(
        email: String,
        first_name: String,
        last_name: String,
        password_hash: Option<String>,
        state: UserState,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name,
            last_name,
            state: state.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == UserState::Active.as_str()
    }

    pub fn is_invited(&self) -> bool {
        self.state == UserState::Invited.as_str()
    }
}

/// User as returned by the API (no credential).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub state: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            state: u.state,
        }
    }
}
