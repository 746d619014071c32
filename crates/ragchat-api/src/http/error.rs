//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use ragchat_types::admission::Decision;
use ragchat_types::error::ChatError;

use crate::http::middleware::rate_limit::{LIMIT_HEADER, REMAINING_HEADER};
use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat session/message errors.
    Chat(ChatError),
    /// Missing or unknown `X-API-KEY`.
    Unauthorized,
    /// Admission denied. `message` names the key and the wait in seconds.
    RateLimited { message: String, decision: Decision },
    /// Unparseable request (body, path or query).
    BadRequest(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Chat(ChatError::SessionNotFound(id)) => {
                ApiResponse::empty(StatusCode::NOT_FOUND, format!("Session not found with id {id}"))
                    .into_response()
            }
            AppError::Chat(ChatError::Validation(errors)) => ApiResponse {
                code: StatusCode::BAD_REQUEST.as_u16(),
                message: "Validation error".to_string(),
                data: Some(errors),
            }
            .into_response(),
            AppError::Chat(ChatError::Repository(e)) => {
                tracing::error!(error = %e, "Repository failure");
                internal_error()
            }
            AppError::Unauthorized => ApiResponse::empty(
                StatusCode::UNAUTHORIZED,
                "Unauthorized: invalid or missing API key",
            )
            .into_response(),
            AppError::RateLimited { message, decision } => {
                let mut response =
                    ApiResponse::empty(StatusCode::TOO_MANY_REQUESTS, message).into_response();
                let headers = response.headers_mut();
                insert_quota_headers(headers, &decision);
                // Whole seconds, rounded up so an immediate retry is never early.
                headers.insert(
                    RETRY_AFTER,
                    HeaderValue::from(decision.retry_after_ms.div_ceil(1000)),
                );
                response
            }
            AppError::BadRequest(msg) => {
                ApiResponse::empty(StatusCode::BAD_REQUEST, msg).into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    ApiResponse::empty(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// `X-RateLimit-Limit` / `X-RateLimit-Remaining` for an admission decision.
pub fn insert_quota_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_types::error::RepositoryError;

    #[test]
    fn test_not_found_is_404() {
        let response = AppError::Chat(ChatError::SessionNotFound(uuid::Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_repository_error_is_500() {
        let response =
            AppError::Chat(ChatError::Repository(RepositoryError::Connection)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_sets_headers() {
        let response = AppError::RateLimited {
            message: "Rate limit exceeded".to_string(),
            decision: Decision {
                allowed: false,
                limit: 3,
                remaining: 0,
                retry_after_ms: 700,
            },
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers[LIMIT_HEADER], "3");
        assert_eq!(headers[REMAINING_HEADER], "0");
        assert_eq!(headers[RETRY_AFTER], "1");
    }
}
