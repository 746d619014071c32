//! Request extractors whose rejections use the API envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use uuid::Uuid;

use crate::http::error::AppError;

/// JSON body extractor. Any body that cannot be decoded answers
/// `400 "Malformed JSON request"`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "Malformed JSON in request");
        AppError::BadRequest("Malformed JSON request".to_string())
    }
}

/// Query string extractor with an enveloped 400 on bad parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::BadRequest(format!("Invalid session id: {s}")))
}
