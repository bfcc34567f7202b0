//! Bearer Token Authentication
//!
//! Extracts and verifies the `Authorization: Bearer` token of a request.
//! Handlers then check the scopes their route needs.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::api::error::{ApiError, ApiResult};
use crate::credentials::Profile;
use crate::state::AppState;

/// Verified identity of the caller
#[derive(Debug, Clone)]
pub struct Auth(pub Profile);

impl Auth {
    /// The caller's profile, if it carries `scope`
    pub fn require_scope(&self, scope: &str) -> ApiResult<&Profile> {
        if self.0.has_scope(scope) {
            Ok(&self.0)
        } else {
            Err(ApiError::Forbidden(format!("Missing scope: {}", scope)))
        }
    }
}

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let profile = state.credentials.verify(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            ApiError::Unauthorized("Invalid token".to_string())
        })?;

        Ok(Auth(profile))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
