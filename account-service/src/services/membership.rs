use std::sync::Arc;

use uuid::Uuid;

use crate::{
    models::{Member, Membership, Organization, RoleAssignment, RoleScope, User, MEMBER_ROLE},
    services::ServiceError,
    store::Store,
    utils::normalize_email,
};

#[derive(Debug, Clone)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Organization membership: attach existing users, list members.
#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Store>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Attach an existing user to the organization with the member role.
    ///
    /// `invited_by` is the acting user. When it is absent or unknown the
    /// invitee is recorded as its own inviter.
    pub async fn add_member(
        &self,
        slug: &str,
        member: NewMember,
        invited_by: Option<Uuid>,
    ) -> Result<(User, Membership), ServiceError> {
        let mut uow = self.store.begin().await?;

        let organization = uow
            .find_organization_by_slug(slug)
            .await?
            .ok_or(ServiceError::OrganizationNotFound)?;

        let email = normalize_email(&member.email);
        let user = uow
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if uow
            .find_membership(user.id, organization.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyMember);
        }

        let role = uow
            .find_role(RoleScope::Organization, MEMBER_ROLE)
            .await?
            .ok_or_else(|| {
                ServiceError::Configuration(format!("{} role not found", MEMBER_ROLE))
            })?;

        let invited_by_id = match invited_by {
            Some(inviter_id) => {
                if uow.find_user_by_id(inviter_id).await?.is_some() {
                    inviter_id
                } else {
                    tracing::warn!(
                        inviter_id = %inviter_id,
                        "Inviter not found, recording invitee as inviter"
                    );
                    user.id
                }
            }
            None => user.id,
        };

        let membership = Membership::active(user.id, organization.id, invited_by_id);
        uow.insert_membership(&membership).await?;
        uow.insert_role_assignment(&RoleAssignment::new(
            user.id,
            role.id,
            Some(organization.id),
        ))
        .await?;

        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            organization_id = %organization.id,
            invited_by_id = %invited_by_id,
            "Member added"
        );

        Ok((user, membership))
    }

    pub async fn list_members(
        &self,
        slug: &str,
    ) -> Result<(Organization, Vec<Member>), ServiceError> {
        let mut uow = self.store.begin().await?;

        let organization = uow
            .find_organization_by_slug(slug)
            .await?
            .ok_or(ServiceError::OrganizationNotFound)?;

        let members = uow.list_members(organization.id).await?;

        Ok((organization, members))
    }
}
