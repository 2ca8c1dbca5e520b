//! Persistence boundary.
//!
//! Services talk to storage only through a [`UnitOfWork`] obtained from
//! [`Store::begin`]. Every write inside one unit of work commits or rolls
//! back together; dropping a unit of work without calling
//! [`UnitOfWork::commit`] rolls it back.

mod memory;
mod postgres;

pub use memory::{MemoryStore, Tables};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Member, Membership, Organization, Role, RoleAssignment, RoleScope, Session, User,
};

/// Names of the unique constraints the services translate into domain errors.
pub mod constraints {
    pub const ORGANIZATION_SLUG: &str = "organizations_slug_key";
    pub const USER_EMAIL: &str = "users_email_key";
    pub const MEMBERSHIP_PAIR: &str = "organization_users_user_org_key";
    pub const ROLE_ASSIGNMENT: &str = "role_assignments_user_role_org_key";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("store error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    // ==================== Organizations ====================

    async fn find_organization_by_slug(&mut self, slug: &str) -> StoreResult<Option<Organization>>;

    /// Returns the subset of `slugs` already used by an organization.
    async fn find_taken_slugs(&mut self, slugs: &[String]) -> StoreResult<Vec<String>>;

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()>;

    // ==================== Users ====================

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&mut self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;

    /// Set the credential of an invited user and mark it active. Returns
    /// `false` when the user is not in the invited state.
    async fn activate_user(&mut self, user_id: Uuid, password_hash: &str) -> StoreResult<bool>;

    // ==================== Roles ====================

    async fn find_role(&mut self, scope: RoleScope, name: &str) -> StoreResult<Option<Role>>;

    async fn insert_role_assignment(&mut self, assignment: &RoleAssignment) -> StoreResult<()>;

    // ==================== Memberships ====================

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<Membership>>;

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()>;

    /// Members of an organization in storage order.
    async fn list_members(&mut self, organization_id: Uuid) -> StoreResult<Vec<Member>>;

    /// Organization of the user's earliest membership (by `joined_at`, then
    /// organization id).
    async fn find_primary_organization(
        &mut self,
        user_id: Uuid,
    ) -> StoreResult<Option<Organization>>;

    // ==================== Sessions ====================

    async fn insert_session(&mut self, session: &Session) -> StoreResult<()>;

    async fn find_session(&mut self, session_id: Uuid) -> StoreResult<Option<Session>>;

    /// Swap the digest and expiry of a session, but only while it still holds
    /// `current_hash`. Returns `false` when the session is gone or another
    /// rotation got there first.
    async fn rotate_session(
        &mut self,
        session_id: Uuid,
        current_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Delete every session of a user, returning how many were removed.
    async fn delete_user_sessions(&mut self, user_id: Uuid) -> StoreResult<u64>;

    /// Delete the user's sessions that expired at or before `now`.
    async fn delete_expired_sessions(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
