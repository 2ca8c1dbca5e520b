use service_core::error::AppError;
use thiserror::Error;

use crate::store::{constraints, StoreError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Organization slug already exists")]
    SlugConflict,

    #[error("Email already registered")]
    EmailConflict,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists in this organization")]
    AlreadyMember,

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Unique violations surface as the matching domain conflict; the storage
/// constraint is authoritative even when a pre-check passed.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        let conflict = match &err {
            StoreError::UniqueViolation { constraint } => match constraint.as_str() {
                constraints::ORGANIZATION_SLUG => Some(ServiceError::SlugConflict),
                constraints::USER_EMAIL => Some(ServiceError::EmailConflict),
                constraints::MEMBERSHIP_PAIR => Some(ServiceError::AlreadyMember),
                _ => None,
            },
            StoreError::Backend(_) => None,
        };
        conflict.unwrap_or_else(|| ServiceError::Store(err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            e @ (ServiceError::SlugConflict
            | ServiceError::EmailConflict
            | ServiceError::InvalidCredentials
            | ServiceError::AlreadyMember) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            e @ (ServiceError::OrganizationNotFound | ServiceError::UserNotFound) => {
                AppError::NotFound(anyhow::anyhow!(e.to_string()))
            }
            ServiceError::Unauthenticated => {
                AppError::Unauthorized(anyhow::anyhow!("Unauthorized"))
            }
            ServiceError::Configuration(e) => AppError::ConfigError(anyhow::anyhow!(e)),
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::{http::StatusCode, response::IntoResponse};

    fn status(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn business_rule_violations_are_400() {
        assert_eq!(status(ServiceError::SlugConflict), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::EmailConflict), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::InvalidCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::AlreadyMember), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ServiceError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lookups_are_404_and_auth_is_401() {
        assert_eq!(status(ServiceError::OrganizationNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(ServiceError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(ServiceError::Unauthenticated), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn server_faults_are_500() {
        assert_eq!(
            status(ServiceError::Configuration("Admin role not found".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ServiceError::Store(StoreError::Backend(anyhow::anyhow!("down")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unique_violations_map_by_constraint() {
        let map = |c: &str| ServiceError::from(StoreError::unique(c));
        assert!(matches!(map(constraints::ORGANIZATION_SLUG), ServiceError::SlugConflict));
        assert!(matches!(map(constraints::USER_EMAIL), ServiceError::EmailConflict));
        assert!(matches!(map(constraints::MEMBERSHIP_PAIR), ServiceError::AlreadyMember));
        assert!(matches!(map("something_else"), ServiceError::Store(_)));
    }
}
