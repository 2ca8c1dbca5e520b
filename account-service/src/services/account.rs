use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{Membership, Organization, RoleAssignment, RoleScope, User, ADMIN_ROLE},
    services::{
        session::{ClientInfo, IssuedSession, SessionIssuer, TokenPair},
        ServiceError,
    },
    store::{Store, UnitOfWork},
    utils::{
        build_suggestions, generate_slug, normalize_email, CredentialHasher, Password,
        PasswordHashString,
    },
};

/// Registration input after transport validation.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Password,
    pub organization_name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub user: User,
    pub organization: Organization,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub organization: Option<Organization>,
}

pub struct RefreshOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugAvailability {
    pub available: bool,
    pub suggested_slug: String,
    /// Free alternatives; only present when the base slug is taken.
    pub suggestions: Option<Vec<String>>,
}

/// Registration, login, logout and refresh over a [`Store`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    hasher: CredentialHasher,
    sessions: SessionIssuer,
    superuser_email: Option<String>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: CredentialHasher,
        sessions: SessionIssuer,
        superuser_email: Option<String>,
    ) -> Self {
        Self {
            store,
            hasher,
            sessions,
            superuser_email: superuser_email.map(|email| normalize_email(&email)),
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Create an organization with its first admin and that admin's first
    /// session. Every write commits together or not at all.
    pub async fn register(
        &self,
        input: RegisterInput,
        issued: &IssuedSession,
        client: &ClientInfo,
    ) -> Result<RegisterOutcome, ServiceError> {
        let email = normalize_email(&input.email);
        let slug = generate_slug(
            input
                .slug
                .as_deref()
                .unwrap_or(input.organization_name.as_str()),
        );
        if slug.is_empty() {
            return Err(ServiceError::Validation(
                "Organization name must contain letters or digits".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        // Advisory; the unique constraint on the slug is what actually holds.
        if uow.find_organization_by_slug(&slug).await?.is_some() {
            return Err(ServiceError::SlugConflict);
        }

        let superuser = match &self.superuser_email {
            Some(superuser_email) => uow.find_user_by_email(superuser_email).await?,
            None => None,
        };

        let organization = Organization::new(input.organization_name.trim().to_string(), slug);
        uow.insert_organization(&organization).await?;

        let password_hash = self.hasher.hash(&input.password).await?;
        let user = self
            .upsert_registrant(uow.as_mut(), &input, email, password_hash)
            .await?;

        let admin_role = uow
            .find_role(RoleScope::Organization, ADMIN_ROLE)
            .await?
            .ok_or_else(|| ServiceError::Configuration("Admin role not found".to_string()))?;

        uow.insert_role_assignment(&RoleAssignment::new(
            user.id,
            admin_role.id,
            Some(organization.id),
        ))
        .await?;

        let invited_by_id = superuser.as_ref().map(|s| s.id).unwrap_or(user.id);
        uow.insert_membership(&Membership::active(user.id, organization.id, invited_by_id))
            .await?;

        uow.insert_session(&issued.record(user.id, client)).await?;

        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            organization_id = %organization.id,
            slug = %organization.slug,
            "Organization registered"
        );

        Ok(RegisterOutcome { user, organization })
    }

    /// Create a fresh active user, or give an invited placeholder its
    /// credential. An already active account is never overwritten.
    async fn upsert_registrant(
        &self,
        uow: &mut dyn UnitOfWork,
        input: &RegisterInput,
        email: String,
        password_hash: PasswordHashString,
    ) -> Result<User, ServiceError> {
        match uow.find_user_by_email(&email).await? {
            None => {
                let user = User::active(
                    email,
                    input.first_name.trim().to_string(),
                    input.last_name.trim().to_string(),
                    password_hash.into_string(),
                );
                uow.insert_user(&user).await?;
                Ok(user)
            }
            Some(existing) if existing.is_invited() => {
                if !uow
                    .activate_user(existing.id, password_hash.as_str())
                    .await?
                {
                    return Err(ServiceError::EmailConflict);
                }
                tracing::info!(user_id = %existing.id, "Invited user completed registration");
                uow.find_user_by_id(existing.id)
                    .await?
                    .ok_or(ServiceError::UserNotFound)
            }
            Some(_) => Err(ServiceError::EmailConflict),
        }
    }

    /// Verify credentials and persist a new session. Unknown email, invited
    /// account and wrong password all fail the same way.
    pub async fn login(
        &self,
        email: &str,
        password: &Password,
        issued: &IssuedSession,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, ServiceError> {
        let email = normalize_email(email);

        let user = {
            let mut uow = self.store.begin().await?;
            uow.find_user_by_email(&email).await?
        };

        let user = match user {
            Some(user) if user.is_active() => user,
            _ => {
                self.hasher.verify_absent(password).await;
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let stored = PasswordHashString::new(user.password_hash.clone().unwrap_or_default());
        if !self.hasher.verify(password, &stored).await {
            tracing::warn!(user_id = %user.id, "Login failed: invalid password");
            return Err(ServiceError::InvalidCredentials);
        }

        let mut uow = self.store.begin().await?;
        let pruned = uow.delete_expired_sessions(user.id, Utc::now()).await?;
        uow.insert_session(&issued.record(user.id, client)).await?;
        let organization = uow.find_primary_organization(user.id).await?;
        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            organization_id = ?organization.as_ref().map(|o| o.id),
            expired_sessions_pruned = pruned,
            "User logged in"
        );

        Ok(LoginOutcome { user, organization })
    }

    /// Drop every session of the user, on every device.
    pub async fn logout(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let mut uow = self.store.begin().await?;
        let removed = uow.delete_user_sessions(user_id).await?;
        uow.commit().await?;

        tracing::info!(user_id = %user_id, sessions_removed = removed, "User logged out");
        Ok(removed)
    }

    /// Exchange a refresh token for a new token pair, rotating the session
    /// in place. Any mismatch is `Unauthenticated`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, ServiceError> {
        let claims = self.sessions.verify_refresh_token(refresh_token)?;
        let session_id = claims.session_id()?;

        let mut uow = self.store.begin().await?;

        let session = uow
            .find_session(session_id)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        if !self
            .sessions
            .token_hasher()
            .verify_token_hash(&session.refresh_token_hash, refresh_token)
        {
            tracing::warn!(session_id = %session_id, "Refresh token digest mismatch");
            return Err(ServiceError::Unauthenticated);
        }

        if session.is_expired() {
            return Err(ServiceError::Unauthenticated);
        }

        let user = uow
            .find_user_by_id(session.user_id)
            .await?
            .filter(User::is_active)
            .ok_or(ServiceError::Unauthenticated)?;

        let rotated = self.sessions.reissue_session(session.id)?;
        if !uow
            .rotate_session(
                session.id,
                &session.refresh_token_hash,
                &rotated.refresh_token_hash,
                rotated.expires_at,
            )
            .await?
        {
            tracing::warn!(session_id = %session_id, "Refresh lost a concurrent rotation");
            return Err(ServiceError::Unauthenticated);
        }
        uow.delete_expired_sessions(user.id, Utc::now()).await?;
        uow.commit().await?;

        let access_token = self.sessions.issue_access_token(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Session refreshed");

        Ok(RefreshOutcome {
            user,
            tokens: TokenPair {
                access_token,
                refresh_token: rotated.refresh_token,
            },
        })
    }

    /// Whether the slug derived from `organization_name` is free, with free
    /// alternatives when it is not.
    pub async fn check_slug_availability(
        &self,
        organization_name: &str,
    ) -> Result<SlugAvailability, ServiceError> {
        let suggested_slug = generate_slug(organization_name);
        if suggested_slug.is_empty() {
            return Err(ServiceError::Validation(
                "Organization name must contain letters or digits".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        if uow.find_organization_by_slug(&suggested_slug).await?.is_none() {
            return Ok(SlugAvailability {
                available: true,
                suggested_slug,
                suggestions: None,
            });
        }

        let candidates = build_suggestions(organization_name);
        let taken = uow.find_taken_slugs(&candidates).await?;
        let suggestions = candidates
            .into_iter()
            .filter(|candidate| !taken.contains(candidate))
            .collect();

        Ok(SlugAvailability {
            available: false,
            suggested_slug,
            suggestions: Some(suggestions),
        })
    }
}
