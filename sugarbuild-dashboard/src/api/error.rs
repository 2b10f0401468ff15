//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::service::dump_service::DumpError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// No dump exists for the requested branch; answered in plain text
    /// because peers match on the message
    MissingDump(String),
    BadRequest(String),
    IoError(std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingDump(branch) => {
                return (
                    StatusCode::NOT_FOUND,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("No data file for ({}) found.", branch),
                )
                    .into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::IoError(err) => {
                tracing::error!("Filesystem error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DumpError> for ApiError {
    fn from(err: DumpError) -> Self {
        match err {
            DumpError::InvalidName(msg) => ApiError::BadRequest(msg),
            DumpError::Io(err) => ApiError::IoError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
