//! License key generation and validation.
//!
//! This module provides functions for generating and validating human-readable license keys
//! in the format `PREFIX-XXXX-XXXX-XXXX-XXXX`.
//!
//! Unlike a single global prefix, each brand carries its own prefix (`Brand::key_prefix`), so
//! the config here is constructed per-request from the brand record rather than from global
//! configuration.
//!
//! # Features
//!
//! - Configurable prefix (e.g., "ACME", "KERYX")
//! - Fixed segment layout: 4 segments of 4 characters each
//! - Uses cryptographically secure random number generation
//! - Excludes ambiguous characters (0, O, I, L, 1) for readability
//! - Format validation
//!
//! # Example
//!
//! ```rust,ignore
//! use warden::license_key::{generate_license_key, validate_license_key_format, LicenseKeyConfig};
//!
//! let config = LicenseKeyConfig::new("ACME");
//! let key = generate_license_key(&config);
//! assert!(validate_license_key_format(&key, &config));
//! ```

use rand::Rng;

use crate::errors::{LicenseError, LicenseResult};

/// Character set for license key generation.
/// Excludes ambiguous characters: 0, O, I, L, 1
const LICENSE_KEY_CHARSET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Fixed number of segments after the prefix.
pub const KEY_SEGMENTS: u8 = 4;
/// Fixed length of each segment.
pub const KEY_SEGMENT_LENGTH: u8 = 4;

/// Configuration for license key generation, scoped to a single brand's prefix.
#[derive(Debug, Clone)]
pub struct LicenseKeyConfig {
    /// Prefix for the license key, taken from the owning brand (e.g., "ACME", "KERYX")
    pub prefix: String,
    /// Number of segments after the prefix
    pub segments: u8,
    /// Length of each segment
    pub segment_length: u8,
}

impl LicenseKeyConfig {
    /// Build a key config for a brand's prefix, using the fixed segment layout.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            segments: KEY_SEGMENTS,
            segment_length: KEY_SEGMENT_LENGTH,
        }
    }
}

/// Generate a single segment of random characters.
fn generate_segment(length: u8) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..LICENSE_KEY_CHARSET.len());
            LICENSE_KEY_CHARSET[idx] as char
        })
        .collect()
}

/// Generate a license key with the given configuration.
///
/// # Format
///
/// The generated key follows the format: `PREFIX-XXXX-XXXX-XXXX-XXXX`
/// where:
/// - `PREFIX` is the brand's configured prefix
/// - Each `XXXX` is a segment of random characters
///
/// # Example
///
/// ```rust,ignore
/// use warden::license_key::{generate_license_key, LicenseKeyConfig};
///
/// let config = LicenseKeyConfig::new("KERYX");
/// let key = generate_license_key(&config);
/// // Produces something like: "KERYX-A2B3-C4D5-E6F7-G8H9"
/// ```
pub fn generate_license_key(config: &LicenseKeyConfig) -> String {
    let segments: Vec<String> = (0..config.segments)
        .map(|_| generate_segment(config.segment_length))
        .collect();

    format!("{}-{}", config.prefix, segments.join("-"))
}

/// Validate that a license key matches the expected format.
///
/// This validates:
/// - The key starts with the expected prefix
/// - The key has the correct number of segments
/// - Each segment has the correct length
/// - All characters in segments are from the valid character set
///
/// # Example
///
/// ```rust,ignore
/// use warden::license_key::{validate_license_key_format, LicenseKeyConfig};
///
/// let config = LicenseKeyConfig::new("LIC");
/// assert!(validate_license_key_format("LIC-A2B3-C4D5-E6F7-G8H9", &config));
/// assert!(!validate_license_key_format("INVALID-KEY", &config));
/// ```
pub fn validate_license_key_format(key: &str, config: &LicenseKeyConfig) -> bool {
    let parts: Vec<&str> = key.split('-').collect();

    let expected_parts = 1 + config.segments as usize;
    if parts.len() != expected_parts {
        return false;
    }

    if parts[0] != config.prefix {
        return false;
    }

    for segment in &parts[1..] {
        if segment.len() != config.segment_length as usize {
            return false;
        }

        for ch in segment.chars() {
            if !LICENSE_KEY_CHARSET.contains(&(ch as u8)) {
                return false;
            }
        }
    }

    true
}

/// Parse a license key and extract its components.
///
/// Returns `Some((prefix, segments))` if the key is at least minimally well-formed.
pub fn parse_license_key(key: &str) -> Option<(String, Vec<String>)> {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() < 2 {
        return None;
    }

    let prefix = parts[0].to_string();
    let segments: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();

    Some((prefix, segments))
}

/// Generate a unique license key, checking against existing keys.
///
/// This function generates keys until it finds one that doesn't already exist (scoped to the
/// owning brand via `exists_fn`). It will retry up to `max_retries` times before giving up.
///
/// # Errors
///
/// Returns an error if a unique key cannot be generated within the retry limit.
pub async fn generate_unique_license_key<F, Fut>(
    config: &LicenseKeyConfig,
    exists_fn: F,
    max_retries: u32,
) -> LicenseResult<String>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = LicenseResult<bool>>,
{
    for _ in 0..max_retries {
        let key = generate_license_key(config);
        if !exists_fn(key.clone()).await? {
            return Ok(key);
        }
    }

    Err(LicenseError::Internal(format!(
        "failed to generate unique license key after {max_retries} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key_has_correct_format() {
        let config = LicenseKeyConfig::new("LIC");
        let key = generate_license_key(&config);

        assert!(key.starts_with("LIC-"));

        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 5); // prefix + 4 segments

        for segment in &parts[1..] {
            assert_eq!(segment.len(), 4);
        }
    }

    #[test]
    fn generate_key_uses_valid_characters() {
        let config = LicenseKeyConfig::new("LIC");
        let key = generate_license_key(&config);

        let parts: Vec<&str> = key.split('-').collect();
        for segment in &parts[1..] {
            for ch in segment.chars() {
                assert!(
                    LICENSE_KEY_CHARSET.contains(&(ch as u8)),
                    "Invalid character: {}",
                    ch
                );
            }
        }
    }

    #[test]
    fn generate_key_excludes_ambiguous_characters() {
        let config = LicenseKeyConfig::new("LIC");
        for _ in 0..100 {
            let key = generate_license_key(&config);

            let parts: Vec<&str> = key.split('-').collect();
            for segment in &parts[1..] {
                assert!(!segment.contains('0'), "Segment contains '0': {}", segment);
                assert!(!segment.contains('O'), "Segment contains 'O': {}", segment);
                assert!(!segment.contains('I'), "Segment contains 'I': {}", segment);
                assert!(!segment.contains('L'), "Segment contains 'L': {}", segment);
                assert!(!segment.contains('1'), "Segment contains '1': {}", segment);
            }
        }
    }

    #[test]
    fn generate_key_uses_brand_prefix() {
        let config = LicenseKeyConfig::new("KERYX");
        let key = generate_license_key(&config);

        assert!(key.starts_with("KERYX-"));
        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 5);
        for segment in &parts[1..] {
            assert_eq!(segment.len(), 4);
        }
    }

    #[test]
    fn validate_format_accepts_valid_key() {
        let config = LicenseKeyConfig::new("LIC");
        let key = generate_license_key(&config);
        assert!(validate_license_key_format(&key, &config));
    }

    #[test]
    fn validate_format_rejects_wrong_prefix() {
        let config = LicenseKeyConfig::new("LIC");
        assert!(!validate_license_key_format(
            "WRONG-A2B3-C4D5-E6F7-G8H9",
            &config
        ));
    }

    #[test]
    fn validate_format_rejects_wrong_segment_count() {
        let config = LicenseKeyConfig::new("LIC");
        assert!(!validate_license_key_format("LIC-A2B3-C4D5", &config));
        assert!(!validate_license_key_format(
            "LIC-A2B3-C4D5-E6F7-G8H9-J2K3",
            &config
        ));
    }

    #[test]
    fn validate_format_rejects_wrong_segment_length() {
        let config = LicenseKeyConfig::new("LIC");
        assert!(!validate_license_key_format("LIC-A2-C4D5-E6F7-G8H9", &config));
        assert!(!validate_license_key_format(
            "LIC-A2B3C-C4D5-E6F7-G8H9",
            &config
        ));
    }

    #[test]
    fn validate_format_rejects_invalid_characters() {
        let config = LicenseKeyConfig::new("LIC");
        assert!(!validate_license_key_format(
            "LIC-AOOO-C4D5-E6F7-G8H9",
            &config
        ));
        assert!(!validate_license_key_format(
            "LIC-A000-C4D5-E6F7-G8H9",
            &config
        ));
        assert!(!validate_license_key_format(
            "LIC-a2b3-C4D5-E6F7-G8H9",
            &config
        ));
    }

    #[test]
    fn parse_key_extracts_components() {
        let result = parse_license_key("LIC-A2B3-C4D5-E6F7-G8H9");
        assert!(result.is_some());

        let (prefix, segments) = result.unwrap();
        assert_eq!(prefix, "LIC");
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "A2B3");
        assert_eq!(segments[1], "C4D5");
        assert_eq!(segments[2], "E6F7");
        assert_eq!(segments[3], "G8H9");
    }

    #[test]
    fn parse_key_returns_none_for_invalid() {
        assert!(parse_license_key("INVALID").is_none());
        assert!(parse_license_key("").is_none());
    }

    #[test]
    fn generated_keys_are_unique() {
        let config = LicenseKeyConfig::new("LIC");
        let mut keys = std::collections::HashSet::new();

        for _ in 0..1000 {
            let key = generate_license_key(&config);
            assert!(keys.insert(key.clone()), "Duplicate key generated: {}", key);
        }
    }

    #[tokio::test]
    async fn generate_unique_retries_on_collision() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let config = LicenseKeyConfig::new("LIC");
        let calls = AtomicUsize::new(0);
        let key = generate_unique_license_key(
            &config,
            |_k| {
                let seen = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(seen >= 2) }
            },
            10,
        )
        .await;
        assert!(key.is_ok());
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }
}
