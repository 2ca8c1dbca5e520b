use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        members::{AddMemberRequest, AddMemberResponse, MembersResponse},
        ErrorResponse,
    },
    middleware::MaybeAuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Add an existing user to an organization
#[utoipa::path(
    post,
    path = "/organizations/{slug}/members",
    params(
        ("slug" = String, Path, description = "Organization slug")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member added", body = AddMemberResponse),
        (status = 400, description = "Validation error or already a member", body = ErrorResponse),
        (status = 404, description = "Organization or user not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Organizations"
)]
pub async fn add_member(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    MaybeAuthUser(inviter): MaybeAuthUser,
    ValidatedJson(req): ValidatedJson<AddMemberRequest>,
) -> Result<Json<AddMemberResponse>, AppError> {
    let (user, _membership) = state
        .membership_service
        .add_member(&slug, req.into(), inviter.map(|auth| auth.user_id))
        .await?;

    Ok(Json(AddMemberResponse {
        message: "Member added successfully".to_string(),
        user: user.into(),
    }))
}

/// List the members of an organization
#[utoipa::path(
    get,
    path = "/organizations/{slug}/members",
    params(
        ("slug" = String, Path, description = "Organization slug")
    ),
    responses(
        (status = 200, description = "Members with their users", body = MembersResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Organizations"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<MembersResponse>, AppError> {
    let (_organization, members) = state.membership_service.list_members(&slug).await?;

    Ok(Json(MembersResponse {
        members: members.into_iter().map(Into::into).collect(),
    }))
}
