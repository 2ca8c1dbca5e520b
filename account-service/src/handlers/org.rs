use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        org::{SlugCheckRequest, SlugCheckResponse},
        ErrorResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Check whether the slug for an organization name is free
#[utoipa::path(
    post,
    path = "/org-slug/check",
    request_body = SlugCheckRequest,
    responses(
        (status = 200, description = "Availability, with free alternatives when taken", body = SlugCheckResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Organizations"
)]
pub async fn check_slug(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SlugCheckRequest>,
) -> Result<Json<SlugCheckResponse>, AppError> {
    let availability = state
        .account_service
        .check_slug_availability(&req.organization_name)
        .await?;

    Ok(Json(availability.into()))
}
