//! Crate-wide error type.
//!
//! Every fallible function in this crate returns [`LicenseResult<T>`]. The HTTP boundary
//! (`server::api_error::ApiError`) owns the one mapping from these tags to status codes and
//! wire error codes; nothing upstream of it should construct a status code directly.

use thiserror::Error;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("license is expired")]
    LicenseExpired,

    #[error("license is suspended")]
    LicenseSuspended,

    #[error("license is cancelled")]
    LicenseCancelled,

    #[error("invalid license status for this operation: {0}")]
    InvalidLicenseStatus(String),

    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("seat limit exceeded")]
    SeatLimitExceeded,

    #[error("instance is already active on this license")]
    DuplicateActive,

    #[error("missing or invalid credential")]
    Unauthorized,

    #[error("credential valid but not authorized for this action")]
    Forbidden,

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type LicenseResult<T> = Result<T, LicenseError>;

#[cfg(feature = "server")]
impl From<sqlx::Error> for LicenseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => LicenseError::NotFound("row"),
            other => LicenseError::Database(other.to_string()),
        }
    }
}
