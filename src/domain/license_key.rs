//! Customer-facing credential aggregating one or more licenses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{LicenseError, LicenseResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseKey {
    pub id: Uuid,
    pub brand_id: Uuid,
    /// Printable key, shape `<BRAND_PREFIX>-XXXX-XXXX-XXXX-XXXX`. Globally unique.
    pub key: String,
    /// SHA-256 hex digest of `key`, indexed for O(1) lookup.
    pub key_hash: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseKey {
    /// Wrap an already-generated key string (see `crate::license_key::generate_license_key`)
    /// into a persistable record.
    pub fn new(brand_id: Uuid, key: String, customer_email: String) -> LicenseResult<Self> {
        if !customer_email.contains('@') {
            return Err(LicenseError::Validation("customer_email is invalid".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            brand_id,
            key_hash: hash(&key),
            key,
            customer_email,
            created_at: now,
            updated_at: now,
        })
    }
}

/// SHA-256 hex digest of a raw license key string.
pub fn hash(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
