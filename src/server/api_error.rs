//! Standardized API error responses for all Warden endpoints.
//!
//! All error responses follow this JSON structure:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "LICENSE_NOT_FOUND",
//!     "message": "The requested license does not exist"
//!   }
//! }
//! ```

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::LicenseError;

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    LicenseNotFound,
    LicenseExpired,
    LicenseSuspended,
    LicenseCancelled,
    InvalidLicenseKey,
    InvalidLicenseStatus,
    InvalidExpiration,
    SeatLimitExceeded,
    DuplicateActive,
    BrandNotFound,
    InvalidApiKey,
    ActivationNotFound,
    InvalidInstanceIdentifier,
    RateLimitExceeded,
    ValidationError,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InvalidLicenseKey
            | ErrorCode::InvalidInstanceIdentifier
            | ErrorCode::InvalidExpiration => StatusCode::BAD_REQUEST,

            ErrorCode::Unauthorized | ErrorCode::InvalidApiKey => StatusCode::UNAUTHORIZED,

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::LicenseNotFound
            | ErrorCode::BrandNotFound
            | ErrorCode::ActivationNotFound
            | ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::Conflict | ErrorCode::DuplicateActive => StatusCode::CONFLICT,

            ErrorCode::LicenseExpired
            | ErrorCode::LicenseSuspended
            | ErrorCode::LicenseCancelled
            | ErrorCode::InvalidLicenseStatus
            | ErrorCode::SeatLimitExceeded => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::LicenseNotFound => "The requested license does not exist",
            ErrorCode::LicenseExpired => "License has expired",
            ErrorCode::LicenseSuspended => "License is suspended",
            ErrorCode::LicenseCancelled => "License is cancelled",
            ErrorCode::InvalidLicenseKey => "License key format is invalid",
            ErrorCode::InvalidLicenseStatus => "License is not in a valid state for this operation",
            ErrorCode::InvalidExpiration => "Expiration date is invalid",
            ErrorCode::SeatLimitExceeded => "No seats are available on this license",
            ErrorCode::DuplicateActive => "This instance is already active on this license",
            ErrorCode::BrandNotFound => "The requested brand does not exist",
            ErrorCode::InvalidApiKey => "API key is missing or invalid",
            ErrorCode::ActivationNotFound => "The requested activation does not exist",
            ErrorCode::InvalidInstanceIdentifier => "Instance identifier is invalid",
            ErrorCode::RateLimitExceeded => "Rate limit exceeded",
            ErrorCode::ValidationError => "Request payload failed validation",
            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::Conflict => "Operation conflicts with current resource state",
            ErrorCode::Unauthorized => "Missing or invalid credential",
            ErrorCode::Forbidden => "Credential is valid but not authorized for this action",
            ErrorCode::InternalError => "An internal error occurred",
        }
    }
}

/// The inner error object containing code and message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Standardized API error response returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
    /// Present only on 429 responses; not serialized into the body, carried as a header.
    #[serde(skip)]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: code.default_message().to_string(),
            },
            retry_after_secs: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            retry_after_secs: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    pub fn not_found(resource: &str) -> Self {
        Self::with_message(ErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_secs;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::NotFound(resource) => {
                let code = match resource {
                    "brand" => ErrorCode::BrandNotFound,
                    "license" => ErrorCode::LicenseNotFound,
                    "activation" => ErrorCode::ActivationNotFound,
                    _ => ErrorCode::NotFound,
                };
                ApiError::with_message(code, format!("{resource} not found"))
            }
            LicenseError::Validation(msg) => ApiError::with_message(ErrorCode::ValidationError, msg),
            LicenseError::LicenseExpired => ApiError::new(ErrorCode::LicenseExpired),
            LicenseError::LicenseSuspended => ApiError::new(ErrorCode::LicenseSuspended),
            LicenseError::LicenseCancelled => ApiError::new(ErrorCode::LicenseCancelled),
            LicenseError::InvalidLicenseStatus(msg) => {
                ApiError::with_message(ErrorCode::InvalidLicenseStatus, msg)
            }
            LicenseError::InvalidExpiration(msg) => {
                ApiError::with_message(ErrorCode::InvalidExpiration, msg)
            }
            LicenseError::SeatLimitExceeded => ApiError::new(ErrorCode::SeatLimitExceeded),
            LicenseError::DuplicateActive => ApiError::new(ErrorCode::DuplicateActive),
            LicenseError::Unauthorized => ApiError::new(ErrorCode::Unauthorized),
            LicenseError::Forbidden => ApiError::new(ErrorCode::Forbidden),
            LicenseError::RateLimited { retry_after_secs } => {
                let mut e = ApiError::new(ErrorCode::RateLimitExceeded);
                e.retry_after_secs = Some(retry_after_secs);
                e
            }
            LicenseError::Conflict(msg) => ApiError::with_message(ErrorCode::Conflict, msg),
            LicenseError::Config(msg) => {
                tracing::error!(error = %msg, "configuration error surfaced at request boundary");
                ApiError::internal_error()
            }
            LicenseError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                ApiError::internal_error()
            }
            LicenseError::Cache(msg) => {
                tracing::error!(error = %msg, "cache error");
                ApiError::internal_error()
            }
            LicenseError::Broker(msg) => {
                tracing::error!(error = %msg, "broker error");
                ApiError::internal_error()
            }
            LicenseError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                ApiError::internal_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(
            ErrorCode::LicenseNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::SeatLimitExceeded.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::DuplicateActive.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error_serialization() {
        let err = ApiError::new(ErrorCode::LicenseNotFound);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("LICENSE_NOT_FOUND"));
        assert!(json.contains("message"));
    }

    #[test]
    fn license_error_not_found_maps_by_resource() {
        let api_err: ApiError = LicenseError::NotFound("license").into();
        assert_eq!(api_err.error.code, ErrorCode::LicenseNotFound);

        let api_err: ApiError = LicenseError::NotFound("brand").into();
        assert_eq!(api_err.error.code, ErrorCode::BrandNotFound);
    }

    #[test]
    fn license_error_seat_limit_maps_to_422() {
        let api_err: ApiError = LicenseError::SeatLimitExceeded.into();
        assert_eq!(api_err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_err.error.code, ErrorCode::SeatLimitExceeded);
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let api_err: ApiError = LicenseError::RateLimited { retry_after_secs: 42 }.into();
        assert_eq!(api_err.retry_after_secs, Some(42));
    }
}
