//! PostgreSQL implementation of the persistence boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::{
    Member, Membership, Organization, Role, RoleAssignment, RoleScope, Session, User,
};

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

/// Unit of work over a single transaction. `sqlx` rolls the transaction
/// back when it is dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

/// Flat row of the members join; column names are aliased to avoid clashes.
#[derive(FromRow)]
struct MemberRow {
    membership_id: Uuid,
    organization_id: Uuid,
    status: String,
    invited_by_id: Uuid,
    joined_at: DateTime<Utc>,
    user_id: Uuid,
    email: String,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    state: String,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            membership: Membership {
                id: row.membership_id,
                user_id: row.user_id,
                organization_id: row.organization_id,
                status: row.status,
                invited_by_id: row.invited_by_id,
                joined_at: row.joined_at,
            },
            user: User {
                id: row.user_id,
                email: row.email,
                password_hash: row.password_hash,
                first_name: row.first_name,
                last_name: row.last_name,
                state: row.state,
                created_at: row.user_created_at,
                updated_at: row.user_updated_at,
            },
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_organization_by_slug(&mut self, slug: &str) -> StoreResult<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, slug, created_at FROM organizations WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)
    }

    async fn find_taken_slugs(&mut self, slugs: &[String]) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT slug FROM organizations WHERE slug = ANY($1)")
            .bind(slugs)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)
    }

    async fn insert_organization(&mut self, organization: &Organization) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, slug, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(organization.id)
        .bind(&organization.name)
        .bind(&organization.slug)
        .bind(organization.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.state)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn activate_user(&mut self, user_id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, state = 'active', updated_at = now()
            WHERE id = $1 AND state = 'invited'
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_role(&mut self, scope: RoleScope, name: &str) -> StoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT id, scope, name, created_at FROM roles WHERE scope = $1 AND name = $2",
        )
        .bind(scope.as_str())
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_role_assignment(&mut self, assignment: &RoleAssignment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_assignments (id, user_id, role_id, organization_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.user_id)
        .bind(assignment.role_id)
        .bind(assignment.organization_id)
        .bind(assignment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, organization_id, status, invited_by_id, joined_at
            FROM organization_users
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_users (id, user_id, organization_id, status, invited_by_id, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(&membership.status)
        .bind(membership.invited_by_id)
        .bind(membership.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn list_members(&mut self, organization_id: Uuid) -> StoreResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id AS membership_id, m.organization_id, m.status, m.invited_by_id, m.joined_at,
                   u.id AS user_id, u.email, u.password_hash, u.first_name, u.last_name, u.state,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM organization_users m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn find_primary_organization(
        &mut self,
        user_id: Uuid,
    ) -> StoreResult<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.slug, o.created_at
            FROM organization_users m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1
            ORDER BY m.joined_at ASC, o.id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)
    }

    async fn insert_session(&mut self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at, user_agent, ip, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(&session.user_agent)
        .bind(&session.ip)
        .bind(session.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_session(&mut self, session_id: Uuid) -> StoreResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)
    }

    async fn rotate_session(
        &mut self,
        session_id: Uuid,
        current_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // The digest predicate is re-checked after a concurrent update commits,
        // so only one of two racing refreshes matches.
        let result = sqlx::query(
            r#"
            UPDATE sessions SET refresh_token_hash = $3, expires_at = $4
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(session_id)
        .bind(current_hash)
        .bind(refresh_token_hash)
        .bind(expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_user_sessions(&mut self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx)
    }
}

/// SQLSTATE 23505 becomes a `UniqueViolation` carrying the constraint name.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or_default().to_string(),
            };
        }
    }
    StoreError::Backend(anyhow::Error::new(err))
}
