//! Request-reply cache for safe retries of mutating brand operations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub brand_id: Uuid,
    /// Client-provided token, unique per brand.
    pub key: String,
    pub status_code: u16,
    pub response_body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(
        brand_id: Uuid,
        key: String,
        status_code: u16,
        response_body: serde_json::Value,
        ttl_hours: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            brand_id,
            key,
            status_code,
            response_body,
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_not_expired() {
        let record = IdempotencyRecord::new(Uuid::new_v4(), "key-1".into(), 201, serde_json::json!({}), 24);
        assert!(!record.is_expired());
    }

    #[test]
    fn zero_ttl_is_immediately_expired() {
        let record = IdempotencyRecord::new(Uuid::new_v4(), "key-1".into(), 201, serde_json::json!({}), 0);
        assert!(record.is_expired());
    }
}
