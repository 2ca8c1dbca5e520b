//! In-process store. A unit of work holds the store lock and edits a copy of
//! the tables; commit swaps the copy in, drop discards it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{constraints, Store, StoreError, StoreResult, UnitOfWork};
use crate::models::{
    Member, Membership, Organization, Role, RoleAssignment, RoleScope, Session, User, UserState,
    SEEDED_ROLES,
};

/// Every table of the store, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub organizations: Vec<Organization>,
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub role_assignments: Vec<RoleAssignment>,
    pub memberships: Vec<Membership>,
    pub sessions: Vec<Session>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the same roles the seed migration installs.
    pub fn with_default_roles() -> Self {
        let tables = Tables {
            roles: SEEDED_ROLES
                .iter()
                .map(|(scope, name)| Role::new(*scope, name))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    pub async fn seed_user(&self, user: User) {
        self.tables.lock().await.users.push(user);
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl MemoryUnitOfWork {
    fn organization(&self, organization_id: Uuid) -> Option<&Organization> {
        self.working
            .organizations
            .iter()
            .find(|o| o.id == organization_id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_organization_by_slug(&mut self, slug: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .working
            .organizations
            .iter()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn find_taken_slugs(&mut self, slugs: &[String]) -> StoreResult<Vec<String>> {
        Ok(self
            .working
            .organizations
            .iter()
            .filter(|o| slugs.contains(&o.slug))
            .map(|o| o.slug.clone())
            .collect())
    }

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()> {
        if self
            .working
            .organizations
            .iter()
            .any(|o| o.slug == organization.slug)
        {
            return Err(StoreError::unique(constraints::ORGANIZATION_SLUG));
        }
        self.working.organizations.push(organization.clone());
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.working.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.working.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if self.working.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::unique(constraints::USER_EMAIL));
        }
        self.working.users.push(user.clone());
        Ok(())
    }

    async fn activate_user(&mut self, user_id: Uuid, password_hash: &str) -> StoreResult<bool> {
        match self
            .working
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.is_invited())
        {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.state = UserState::Active.as_str().to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_role(&mut self, scope: RoleScope, name: &str) -> StoreResult<Option<Role>> {
        Ok(self
            .working
            .roles
            .iter()
            .find(|r| r.scope == scope.as_str() && r.name == name)
            .cloned())
    }

    async fn insert_role_assignment(&mut self, assignment: &RoleAssignment) -> StoreResult<()> {
        if self.working.role_assignments.iter().any(|a| {
            a.user_id == assignment.user_id
                && a.role_id == assignment.role_id
                && a.organization_id == assignment.organization_id
        }) {
            return Err(StoreError::unique(constraints::ROLE_ASSIGNMENT));
        }
        self.working.role_assignments.push(assignment.clone());
        Ok(())
    }

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .working
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .cloned())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        if self.working.memberships.iter().any(|m| {
            m.user_id == membership.user_id && m.organization_id == membership.organization_id
        }) {
            return Err(StoreError::unique(constraints::MEMBERSHIP_PAIR));
        }
        self.working.memberships.push(membership.clone());
        Ok(())
    }

    async fn list_members(&mut self, organization_id: Uuid) -> StoreResult<Vec<Member>> {
        let members = self
            .working
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .filter_map(|m| {
                self.working
                    .users
                    .iter()
                    .find(|u| u.id == m.user_id)
                    .map(|u| Member {
                        membership: m.clone(),
                        user: u.clone(),
                    })
            })
            .collect();
        Ok(members)
    }

    async fn find_primary_organization(
        &mut self,
        user_id: Uuid,
    ) -> StoreResult<Option<Organization>> {
        let primary = self
            .working
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .min_by_key(|m| (m.joined_at, m.organization_id));
        Ok(primary.and_then(|m| self.organization(m.organization_id).cloned()))
    }

    async fn insert_session(&mut self, session: &Session) -> StoreResult<()> {
        self.working.sessions.push(session.clone());
        Ok(())
    }

    async fn find_session(&mut self, session_id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self
            .working
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned())
    }

    async fn rotate_session(
        &mut self,
        session_id: Uuid,
        current_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self
            .working
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.refresh_token_hash == current_hash)
        {
            Some(session) => {
                session.refresh_token_hash = refresh_token_hash.to_string();
                session.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user_sessions(&mut self, user_id: Uuid) -> StoreResult<u64> {
        let before = self.working.sessions.len();
        self.working.sessions.retain(|s| s.user_id != user_id);
        Ok((before - self.working.sessions.len()) as u64)
    }

    async fn delete_expired_sessions(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let before = self.working.sessions.len();
        self.working
            .sessions
            .retain(|s| s.user_id != user_id || s.expires_at > now);
        Ok((before - self.working.sessions.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
