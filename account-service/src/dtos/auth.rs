use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Organization;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    #[schema(example = "Ada")]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    #[schema(example = "Lovelace")]
    pub last_name: String,

    #[serde(deserialize_with = "super::trimmed")]
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "longenough1", min_length = 8)]
    pub password: String,

    #[validate(length(
        min = 2,
        max = 128,
        message = "Organization name must be between 2 and 128 characters"
    ))]
    #[schema(example = "Analytical Engines")]
    pub organization_name: String,

    #[validate(length(min = 2, max = 64, message = "Slug must be between 2 and 64 characters"))]
    #[schema(example = "analytical-engines")]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[schema(example = "Registration successful")]
    pub message: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Analytical Engines")]
    pub organization_name: String,
    #[schema(example = "analytical-engines")]
    pub slug: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "longenough1", min_length = 8)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[schema(example = "Login successful")]
    pub message: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Primary organization; `null` for a user without memberships.
    pub organization: Option<Organization>,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[schema(example = "Token refreshed")]
    pub message: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub refresh_token: String,
}
