use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::{StoreError, UploadError};

/// Errors returned by the matching core to its immediate caller
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => MatchError::Conflict(msg),
            StoreError::InvalidInput(msg) => MatchError::Validation(msg),
            StoreError::MissingUser(id) => MatchError::NotFound(format!("user {}", id)),
            other => MatchError::StoreUnavailable(other),
        }
    }
}

impl MatchError {
    fn code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "not_found",
            MatchError::Conflict(_) => "conflict",
            MatchError::Validation(_) => "validation_failed",
            MatchError::Unauthorized(_) => "unauthorized",
            MatchError::StoreUnavailable(_) => "store_unavailable",
            MatchError::Upload(UploadError::UnsupportedContentType(_)) => "unsupported_media",
            MatchError::Upload(_) => "upload_failed",
        }
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::Conflict(_) => StatusCode::CONFLICT,
            MatchError::Validation(_) => StatusCode::BAD_REQUEST,
            MatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MatchError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MatchError::Upload(UploadError::UnsupportedContentType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            MatchError::Upload(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<validator::ValidationErrors> for MatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MatchError::Validation(errors.to_string())
    }
}
