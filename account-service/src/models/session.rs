//! Session model - a refresh-token digest bound to a user.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted session. Holds the HMAC digest of the refresh token, never the
/// token itself.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
