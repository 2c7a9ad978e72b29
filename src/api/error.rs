//! Unified API error handling
//!
//! All analysis endpoints return `Result<T, ApiError>`; the wire format is
//! a single-field `{"error": "<message>"}` object.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::analysis::AnalysisError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body missing the file path field (400)
    #[error("No file path provided")]
    MissingFilePath,

    /// Image path did not resolve inside the data root (404)
    #[error("File not found")]
    FileNotFound,

    /// Core analysis failure (500)
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFilePath => StatusCode::BAD_REQUEST,
            ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        tracing::error!(
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
