//! Brand-scoped API credential.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Scope granted to an API key. `Read` may only call query endpoints; `Full` may mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyScope {
    Full,
    Read,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub brand_id: Uuid,
    /// First 8 characters of the raw key, plaintext, for display in dashboards.
    pub key_prefix: String,
    /// SHA-256 hex digest of the raw key. The raw key itself is never stored.
    pub key_hash: String,
    pub scope: ApiKeyScope,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const RAW_KEY_LEN: usize = 40;
const RAW_KEY_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a new raw API key (never persisted) plus the `ApiKey` record to store.
pub fn generate(brand_id: Uuid, scope: ApiKeyScope, expires_at: Option<DateTime<Utc>>) -> (String, ApiKey) {
    let mut rng = rand::rng();
    let raw: String = (0..RAW_KEY_LEN)
        .map(|_| RAW_KEY_CHARSET[rng.random_range(0..RAW_KEY_CHARSET.len())] as char)
        .collect();
    let raw_key = format!("wk_{raw}");

    let record = ApiKey {
        id: Uuid::new_v4(),
        brand_id,
        key_prefix: raw_key.chars().take(8).collect(),
        key_hash: hash_key(&raw_key),
        scope,
        expires_at,
        last_used_at: None,
        created_at: Utc::now(),
    };

    (raw_key, record)
}

/// SHA-256 hex digest of a raw key, used both to generate `key_hash` and to look keys up.
pub fn hash_key(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    hex::encode(digest)
}

/// Constant-time comparison of a raw key against a stored hash, to avoid timing side channels
/// on the lookup-then-compare path.
pub fn verify(raw_key: &str, stored_hash: &str) -> bool {
    let computed = hash_key(raw_key);
    let computed_bytes = computed.as_bytes();
    let stored_bytes = stored_hash.as_bytes();
    computed_bytes.len() == stored_bytes.len() && computed_bytes.ct_eq(stored_bytes).into()
}

impl ApiKey {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }

    pub fn touch_last_used(&mut self) {
        self.last_used_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_verifiable_key() {
        let (raw, record) = generate(Uuid::new_v4(), ApiKeyScope::Full, None);
        assert!(verify(&raw, &record.key_hash));
        assert!(!verify("wrong-key", &record.key_hash));
    }

    #[test]
    fn key_prefix_matches_raw_key_start() {
        let (raw, record) = generate(Uuid::new_v4(), ApiKeyScope::Read, None);
        assert!(raw.starts_with(&record.key_prefix));
    }

    #[test]
    fn expiry_check() {
        let (_, mut record) = generate(Uuid::new_v4(), ApiKeyScope::Full, None);
        assert!(!record.is_expired());
        record.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(record.is_expired());
    }

    #[test]
    fn touch_last_used_sets_timestamp() {
        let (_, mut record) = generate(Uuid::new_v4(), ApiKeyScope::Full, None);
        assert!(record.last_used_at.is_none());
        record.touch_last_used();
        assert!(record.last_used_at.is_some());
    }
}
