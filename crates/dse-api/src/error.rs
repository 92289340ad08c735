//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use dse_core::DseError;

/// Wrapper turning service errors into JSON error responses.
#[derive(Debug)]
pub struct ApiError(pub DseError);

impl From<DseError> for ApiError {
    fn from(e: DseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DseError::NotFound(_) => StatusCode::NOT_FOUND,
            DseError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Result alias for request handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
