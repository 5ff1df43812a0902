//! Request validation utilities for the Warden API.
//!
//! This module provides validation functions for common input types
//! used across the API endpoints.

use std::fmt;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a UUID format.
///
/// Accepts UUIDs in the standard format: `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
///
/// # Example
/// ```
/// use warden::server::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "license_id").is_ok());
/// assert!(validate_uuid("invalid-uuid", "license_id").is_err());
/// ```
pub fn validate_uuid(value: &str, field_name: &str) -> ValidationResult<()> {
    let uuid_regex = regex::Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .unwrap();

    if uuid_regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "invalid UUID format (expected: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)"
                .to_string(),
        })
    }
}

/// Validate a license key format.
///
/// License keys follow the pattern `PREFIX-XXXX-XXXX-XXXX-XXXX`:
/// - `PREFIX` is 2-10 uppercase alphanumeric characters (plus `_`/`-`)
/// - Exactly 4 segments of exactly 4 characters drawn from `A-Z0-9`
///
/// # Example
/// ```
/// use warden::server::validation::validate_license_key;
///
/// assert!(validate_license_key("AC-A2B3-C4D5-E6F7-G8H9", "license_key").is_ok());
/// assert!(validate_license_key("invalid", "license_key").is_err());
/// ```
pub fn validate_license_key(value: &str, field_name: &str) -> ValidationResult<()> {
    let key_regex = regex::Regex::new(r"^[A-Z0-9_-]{2,10}(-[A-Z0-9]{4}){4}$").unwrap();

    if key_regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "invalid license key format (expected: PREFIX-XXXX-XXXX-XXXX-XXXX)"
                .to_string(),
        })
    }
}

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use warden::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "name").is_ok());
/// assert!(validate_not_empty("", "name").is_err());
/// assert!(validate_not_empty("   ", "name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate string length is within bounds.
///
/// # Example
/// ```
/// use warden::server::validation::validate_length;
///
/// assert!(validate_length("hello", 1, 10, "name").is_ok());
/// assert!(validate_length("", 1, 10, "name").is_err());
/// ```
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.len();
    if len < min {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at least {} characters", min),
        })
    } else if len > max {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {} characters", max),
        })
    } else {
        Ok(())
    }
}

/// Validate an optional string - if present, validates it's not empty.
pub fn validate_optional_not_empty(value: Option<&str>, field_name: &str) -> ValidationResult<()> {
    if let Some(v) = value {
        validate_not_empty(v, field_name)
    } else {
        Ok(())
    }
}

/// Validate an email address loosely (format only, no DNS/MX lookups).
pub fn validate_email(value: &str, field_name: &str) -> ValidationResult<()> {
    let email_regex = regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    if email_regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "invalid email address format".to_string(),
        })
    }
}

/// Validate a URL slug: lowercase alphanumeric with hyphens, 1-64 chars.
pub fn validate_slug(value: &str, field_name: &str) -> ValidationResult<()> {
    let slug_regex = regex::Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").unwrap();
    if slug_regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "invalid slug (lowercase alphanumeric and hyphens, 1-64 chars)".to_string(),
        })
    }
}

/// Validate an ISO 8601 datetime string.
///
/// Accepts formats:
/// - RFC 3339: `2025-12-31T23:59:59Z`
/// - Date only: `2025-12-31`
/// - Without timezone: `2025-12-31T23:59:59`
pub fn validate_datetime(value: &str, field_name: &str) -> ValidationResult<()> {
    if chrono::DateTime::parse_from_rfc3339(value).is_ok() {
        return Ok(());
    }

    if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return Ok(());
    }

    if chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok() {
        return Ok(());
    }

    Err(ValidationError {
        field: field_name.to_string(),
        message: "invalid datetime format (expected: ISO 8601, e.g., '2025-12-31T23:59:59Z' or '2025-12-31')".to_string(),
    })
}

/// Validate an activation instance identifier (hostname, MAC address, container ID, etc.).
///
/// Loosely constrained: 1-256 printable non-whitespace characters, since the spec imposes no
/// fixed shape on instance identifiers (they vary by `instance_type`).
pub fn validate_instance_identifier(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.is_empty() || value.len() > 256 || value.chars().any(|c| c.is_whitespace()) {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "must be 1-256 non-whitespace characters".to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uuid_valid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "id").is_ok());
        assert!(validate_uuid("00000000-0000-0000-0000-000000000000", "id").is_ok());
        assert!(validate_uuid("FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF", "id").is_ok());
    }

    #[test]
    fn test_validate_uuid_invalid() {
        assert!(validate_uuid("invalid", "id").is_err());
        assert!(validate_uuid("550e8400-e29b-41d4-a716", "id").is_err());
        assert!(validate_uuid("550e8400e29b41d4a716446655440000", "id").is_err());
        assert!(validate_uuid("", "id").is_err());
    }

    #[test]
    fn test_validate_license_key_valid() {
        assert!(validate_license_key("AC-A2B3-C4D5-E6F7-G8H9", "key").is_ok());
        assert!(validate_license_key("KERYX-A2B3-C4D5-E6F7-G8H9", "key").is_ok());
    }

    #[test]
    fn test_validate_license_key_invalid() {
        assert!(validate_license_key("invalid", "key").is_err());
        assert!(validate_license_key("AC-A2B3-C4D5-E6F7", "key").is_err()); // only 3 segments
        assert!(validate_license_key("AC-A2B-C4D5-E6F7-G8H9", "key").is_err()); // short segment
        assert!(validate_license_key("", "key").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("hello", "field").is_ok());
        assert!(validate_not_empty("a", "field").is_ok());
        assert!(validate_not_empty("", "field").is_err());
        assert!(validate_not_empty("   ", "field").is_err());
        assert!(validate_not_empty("\t\n", "field").is_err());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length("hello", 1, 10, "field").is_ok());
        assert!(validate_length("a", 1, 10, "field").is_ok());
        assert!(validate_length("", 1, 10, "field").is_err());
        assert!(validate_length("hello world", 1, 10, "field").is_err());
        assert!(validate_length("hello", 10, 20, "field").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com", "email").is_ok());
        assert!(validate_email("not-an-email", "email").is_err());
        assert!(validate_email("missing@tld", "email").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("acme", "slug").is_ok());
        assert!(validate_slug("acme-pro-2", "slug").is_ok());
        assert!(validate_slug("Acme", "slug").is_err());
        assert!(validate_slug("-acme", "slug").is_err());
        assert!(validate_slug("", "slug").is_err());
    }

    #[test]
    fn test_validate_datetime() {
        assert!(validate_datetime("2025-12-31T23:59:59Z", "dt").is_ok());
        assert!(validate_datetime("2025-12-31T23:59:59+00:00", "dt").is_ok());
        assert!(validate_datetime("2025-12-31", "dt").is_ok());
        assert!(validate_datetime("2025-12-31T23:59:59", "dt").is_ok());
        assert!(validate_datetime("invalid", "dt").is_err());
        assert!(validate_datetime("31-12-2025", "dt").is_err());
    }

    #[test]
    fn test_validate_instance_identifier() {
        assert!(validate_instance_identifier("https://a.example", "instance_identifier").is_ok());
        assert!(validate_instance_identifier("AA:BB:CC:DD:EE:FF", "instance_identifier").is_ok());
        assert!(validate_instance_identifier("", "instance_identifier").is_err());
        assert!(validate_instance_identifier("has space", "instance_identifier").is_err());
        assert!(
            validate_instance_identifier(&"x".repeat(300), "instance_identifier").is_err()
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            field: "test_field".to_string(),
            message: "is invalid".to_string(),
        };
        assert_eq!(err.to_string(), "test_field: is invalid");
    }
}
