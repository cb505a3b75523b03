//! JSON error responses for the read/admin endpoints.
//!
//! The tracking pixel never uses this; it always answers with the image.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use pixtrack_core::error::{ClientCode, TrackerError};

#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn forbidden() -> Self {
        Self(TrackerError::Forbidden)
    }

    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            ClientCode::Forbidden => StatusCode::FORBIDDEN,
            ClientCode::Storage | ClientCode::Config | ClientCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self.0 {
            TrackerError::Forbidden => "Forbidden".to_string(),
            TrackerError::BadRequest(msg) => msg.clone(),
            other => {
                tracing::error!(code = other.client_code().as_str(), error = %other, "request failed");
                "Internal Server Error".to_string()
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
