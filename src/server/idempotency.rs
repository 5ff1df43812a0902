//! Idempotency-Key replay handling for mutating brand endpoints.
//!
//! Scoped to `(brand_id, key)`: the same key from two different brands never collides. A
//! replayed request within the TTL window returns the original response verbatim instead of
//! re-executing the handler.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::IdempotencyConfig;
use crate::domain::IdempotencyRecord;
use crate::errors::LicenseResult;
use crate::server::database::Database;

pub struct IdempotencyStore {
    db: Arc<Database>,
    ttl_hours: i64,
}

impl IdempotencyStore {
    pub fn new(db: Arc<Database>, config: &IdempotencyConfig) -> Self {
        Self { db, ttl_hours: config.ttl_hours }
    }

    /// Returns the previously-stored response for `(brand_id, key)`, if any and not expired.
    pub async fn lookup(&self, brand_id: Uuid, key: &str) -> LicenseResult<Option<(u16, serde_json::Value)>> {
        let record = self.db.get_idempotency_record(brand_id, key).await?;
        Ok(record.filter(|r| !r.is_expired()).map(|r| (r.status_code, r.response_body)))
    }

    pub async fn store(
        &self,
        brand_id: Uuid,
        key: &str,
        status_code: u16,
        response_body: serde_json::Value,
    ) -> LicenseResult<()> {
        let record = IdempotencyRecord::new(brand_id, key.to_string(), status_code, response_body, self.ttl_hours);
        self.db.insert_idempotency_record(&record).await
    }
}
