//! Append-only event trail. Never mutated or deleted once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub changes: serde_json::Value,
    /// Always "system" in this service: there is no human-operator admin UI (see Non-goals).
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn record(
        brand_id: Uuid,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        action: impl Into<String>,
        changes: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            brand_id,
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            changes,
            actor: "system".to_string(),
            created_at: Utc::now(),
        }
    }
}
