use axum::{extract::State, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{RegisterRequest, RegisterResponse},
        ErrorResponse,
    },
    services::{ClientInfo, RegisterInput, TokenPair},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register an organization together with its first admin user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration successful, auth cookies set", body = RegisterResponse),
        (status = 400, description = "Validation error, slug taken or email already registered", body = ErrorResponse),
        (status = 429, description = "Too many registration attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(SignedCookieJar, Json<RegisterResponse>), AppError> {
    let sessions = state.account_service.sessions();
    let issued = sessions.issue_session()?;

    let input = RegisterInput {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        password: Password::new(req.password),
        organization_name: req.organization_name,
        slug: req.slug,
    };

    let outcome = state
        .account_service
        .register(input, &issued, &client)
        .await?;

    let access_token = sessions.issue_access_token(outcome.user.id, &outcome.user.email)?;
    let jar = sessions.attach_cookies(
        jar,
        &TokenPair {
            access_token,
            refresh_token: issued.refresh_token.clone(),
        },
    );

    Ok((
        jar,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
            email: outcome.user.email,
            organization_name: outcome.organization.name,
            slug: outcome.organization.slug,
            refresh_token: issued.refresh_token,
        }),
    ))
}
