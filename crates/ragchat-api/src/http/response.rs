//! Envelope response format for all API responses.
//!
//! Every response, success or error, has the same shape:
//! ```json
//! { "code": 200, "message": "Session creation completed", "data": { ... } }
//! ```
//! `data` is `null` when there is nothing to return.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope wrapping all API payloads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Mirrors the HTTP status code.
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 response carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl ApiResponse<()> {
    /// Envelope with `data: null`.
    pub fn empty(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"code":500,"message":"Failed to serialize response","data":null}"#.to_string()
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
