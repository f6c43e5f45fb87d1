pub mod health;
pub mod report;
pub mod residents;
pub mod review;
pub mod submissions;

use axum::http::HeaderMap;

use super::error::ApiError;

pub(crate) const ACTOR_HEADER: &str = "x-actor-id";

/// Staff endpoints identify the caller through the `X-Actor-Id` header.
pub(crate) fn actor_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::permission_denied("missing X-Actor-Id header"))
}
