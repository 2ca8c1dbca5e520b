use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    services::{AccessTokenClaims, ACCESS_COOKIE},
    AppState,
};

/// Authenticated caller, taken from the signed `access_token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: AccessTokenClaims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = SignedCookieJar::from_headers(&parts.headers, Key::from_ref(&state));

        let token = jar
            .get(ACCESS_COOKIE)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No access token provided")))?;

        let claims = state
            .sessions
            .verify_access_token(token.value())
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid token")))?;
        let user_id = claims
            .user_id()
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid token")))?;

        Ok(AuthUser { user_id, claims })
    }
}

/// Like [`AuthUser`] but never rejects; a missing or bad cookie is `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}
