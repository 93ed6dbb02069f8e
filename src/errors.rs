use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::SecurityEvent;

/// Errors surfaced at the HTTP boundary. Sign-up rule failures are not
/// errors here; they travel as [`crate::signup::ValidationResult`].
#[derive(Debug, Error)]
pub enum AppError {
    // Request parsing errors
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("unsupported media type: expected application/json")]
    UnsupportedMediaType,

    #[error("request body too large")]
    PayloadTooLarge,

    // Rate limiting
    #[error("rate limit exceeded; please try again later")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("resource not found")]
    NotFound,
}

/// Standard JSON error response structure
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Determines the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_details(&self) -> Option<String> {
        match self {
            AppError::RateLimitExceeded {
                retry_after: Some(retry_after),
            } => Some(format!("retry after {} seconds", retry_after.as_secs())),
            _ => None,
        }
    }

    fn retry_after_header(&self) -> Option<HeaderValue> {
        match self {
            AppError::RateLimitExceeded {
                retry_after: Some(retry_after),
            } => HeaderValue::from_str(&retry_after.as_secs().to_string()).ok(),
            _ => None,
        }
    }

    /// Logs the error with appropriate context
    fn log_error(&self) {
        let code = self.status_code();
        match self {
            AppError::RateLimitExceeded { retry_after } => {
                crate::log_security_event!(
                    SecurityEvent::RateLimitExceeded,
                    status_code = %code,
                    retry_after_secs = retry_after.map(|d| d.as_secs()),
                    "Request refused by rate limiter"
                );
            }
            _ => {
                tracing::warn!(
                    error = %self,
                    status_code = %code,
                    "Client error"
                );
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_error();

        let status = self.status_code();
        let retry_after = self.retry_after_header();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            details: self.error_details(),
        });

        let mut response = (status, body).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}
