//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use veloq_core::Error;

/// Wrapper turning core errors into HTTP responses.
///
/// `NoPartitionsAvailable` maps to an empty 204 rather than a failure:
/// an exhausted pool is a successful empty read to consumers.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyExists(_) | Error::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NoPartitionsAvailable => return StatusCode::NO_CONTENT.into_response(),
            Error::Backend(_) | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
