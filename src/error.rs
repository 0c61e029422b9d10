//! # Error Handling
//!
//! This module defines the HTTP-facing error type and how domain errors map
//! onto it.
//!
//! ## Key Rust Concepts for Error Handling:
//! - **Result<T, E>**: Every fallible handler returns `Result<HttpResponse, AppError>`
//! - **From trait**: Lets `?` turn submission errors into `AppError`
//! - **ResponseError trait**: Converts an `AppError` into a JSON HTTP response
//!
//! ## Scope:
//! Only the upload and status routes return `AppError`. The webhook never
//! reports failure to the provider, so callback-path errors are logged there
//! and never reach this type.

use crate::jobs::JobError;
use crate::provider::DispatchError;
use crate::submission::SubmissionError;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Internal**: Server-side problems (500 errors)
/// - **BadRequest**: Client sent invalid data (400 errors)
/// - **ConfigError**: Configuration problems, e.g. no provider API key (500 errors)
/// - **ValidationError**: Upload failed validation rules (400 errors)
/// - **Conflict**: Provider reused a request id that is still tracked (409 errors)
/// - **ProviderError**: Transcription provider refused or failed the dispatch (502 errors)
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::ValidationError("Only audio files are allowed".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
    ConfigError(String),
    ValidationError(String),
    Conflict(String),
    ProviderError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ProviderError(msg) => write!(f, "Transcription provider error: {}", msg),
        }
    }
}

/// Converts errors into HTTP responses.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "provider_error",
///     "message": "provider rejected the request with status 400: ...",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::ProviderError(msg) => (StatusCode::BAD_GATEWAY, "provider_error", msg.clone()),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Submission failures surface synchronously to the uploader, since no job
/// exists yet that could carry the error.
impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Dispatch(DispatchError::NotConfigured) => AppError::ConfigError(
                "Deepgram API key not configured. Please set the DEEPGRAM_API_KEY environment variable".to_string(),
            ),
            SubmissionError::Dispatch(other) => AppError::ProviderError(other.to_string()),
            SubmissionError::Register(err @ JobError::DuplicateId(_)) => AppError::Conflict(err.to_string()),
            SubmissionError::Register(err) => AppError::Internal(err.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_submission_error_mapping() {
        let not_configured: AppError = SubmissionError::Dispatch(DispatchError::NotConfigured).into();
        assert_eq!(not_configured.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let rejected: AppError = SubmissionError::Dispatch(DispatchError::Rejected {
            status: 401,
            body: "Invalid credentials".to_string(),
        })
        .into();
        assert_eq!(rejected.error_response().status(), StatusCode::BAD_GATEWAY);
        assert!(rejected.to_string().contains("401"));

        let duplicate: AppError = SubmissionError::Register(JobError::DuplicateId("abc".to_string())).into();
        assert_eq!(duplicate.error_response().status(), StatusCode::CONFLICT);
    }
}
