//! API key authentication extractor.
//!
//! Reads the credential from the `X-API-KEY` header and checks it against
//! the configured allowlist. With an empty allowlist every request passes
//! (development mode).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::http::error::AppError;
use crate::state::AppState;

/// Credential header, matched case-insensitively.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.auth_disabled() {
            return Ok(Authenticated);
        }

        match api_key(&parts.headers) {
            Some(key) if state.api_keys.contains(key) => Ok(Authenticated),
            _ => {
                tracing::warn!(path = %parts.uri.path(), "Unauthorized access");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// The trimmed `X-API-KEY` value, if present and non-empty.
pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}
