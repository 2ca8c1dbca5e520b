use axum::{extract::State, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{LoginRequest, LoginResponse, RefreshResponse},
        ErrorResponse, MessageResponse,
    },
    middleware::AuthUser,
    services::{ClientInfo, TokenPair, REFRESH_COOKIE},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, auth cookies set", body = LoginResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(SignedCookieJar, Json<LoginResponse>), AppError> {
    let sessions = state.account_service.sessions();
    let issued = sessions.issue_session()?;

    let outcome = state
        .account_service
        .login(&req.email, &Password::new(req.password), &issued, &client)
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
        Json(LoginResponse {
            message: "Login successful".to_string(),
            email: outcome.user.email,
            organization: outcome.organization,
            refresh_token: issued.refresh_token,
        }),
    ))
}

/// Logout from every device
#[utoipa::path(
    delete,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out, auth cookies cleared", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("access_token_cookie" = [])
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<MessageResponse>), AppError> {
    state.account_service.logout(user.user_id).await?;

    let jar = state.account_service.sessions().clear_cookies(jar);
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// Rotate the session and mint a new access token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Session refreshed, auth cookies re-set", body = RefreshResponse),
        (status = 401, description = "Missing, invalid or expired refresh token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("refresh_token_cookie" = [])
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<RefreshResponse>), AppError> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No refresh token provided")))?;

    let outcome = state.account_service.refresh(&refresh_token).await?;

    let jar = state
        .account_service
        .sessions()
        .attach_cookies(jar, &outcome.tokens);

    Ok((
        jar,
        Json(RefreshResponse {
            message: "Token refreshed".to_string(),
            email: outcome.user.email,
            refresh_token: outcome.tokens.refresh_token,
        }),
    ))
}
