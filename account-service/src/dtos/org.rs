use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::SlugAvailability;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlugCheckRequest {
    #[validate(length(min = 1, max = 128, message = "Organization name is required"))]
    #[schema(example = "Sunrise Care")]
    pub organization_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlugCheckResponse {
    #[schema(example = false)]
    pub available: bool,
    #[schema(example = "sunrise-care")]
    pub suggested_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["sunrise-care-health", "sunrise-care-group"]))]
    pub suggestions: Option<Vec<String>>,
}

impl From<SlugAvailability> for SlugCheckResponse {
    fn from(availability: SlugAvailability) -> Self {
        Self {
            available: availability.available,
            suggested_slug: availability.suggested_slug,
            suggestions: availability.suggestions,
        }
    }
}
