use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Member, UserResponse};
use crate::services::NewMember;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    #[schema(example = "Cara")]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    #[schema(example = "Carer")]
    pub last_name: String,

    #[serde(deserialize_with = "super::trimmed")]
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "cara@example.com")]
    pub email: String,
}

impl From<AddMemberRequest> for NewMember {
    fn from(req: AddMemberRequest) -> Self {
        NewMember {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddMemberResponse {
    #[schema(example = "Member added successfully")]
    pub message: String,
    pub user: UserResponse,
}

/// Membership row with its user embedded.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "ACTIVE")]
    pub status: String,
    pub invited_by_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        let Member { membership, user } = member;
        Self {
            id: membership.id,
            user_id: membership.user_id,
            organization_id: membership.organization_id,
            status: membership.status,
            invited_by_id: membership.invited_by_id,
            joined_at: membership.joined_at,
            user: user.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembersResponse {
    pub members: Vec<MemberResponse>,
}
