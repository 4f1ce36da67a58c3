//! Authenticated user extraction.
//!
//! Authentication happens upstream. The gateway in front of this service
//! verifies the session and forwards the user id in `X-User-Id`, which is
//! trusted as-is.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request.
///
/// ```rust,ignore
/// async fn handler(AuthenticatedUser(user_id): AuthenticatedUser) { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match user_id {
            Some(id) => Ok(AuthenticatedUser(id.to_string())),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized - No Token Provided" })),
            )
                .into_response()),
        }
    }
}
