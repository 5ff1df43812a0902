//! Brand-scoped webhook subscription.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub url: String,
    /// Shared HMAC secret; never returned to clients after creation.
    pub secret: String,
    pub events: HashSet<String>,
    pub is_active: bool,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub created_at: DateTime<Utc>,
}

impl WebhookConfig {
    pub fn new(brand_id: Uuid, url: String, secret: String, events: HashSet<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            brand_id,
            url,
            secret,
            events,
            is_active: true,
            max_retries: 3,
            timeout_seconds: 10,
            created_at: Utc::now(),
        }
    }

    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.is_active && self.events.contains(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribes_to_checks_active_and_event_set() {
        let mut events = HashSet::new();
        events.insert("license_activated".to_string());
        let mut config = WebhookConfig::new(Uuid::new_v4(), "https://hooks.example/cb".into(), "s3cr3t".into(), events);

        assert!(config.subscribes_to("license_activated"));
        assert!(!config.subscribes_to("license_cancelled"));

        config.is_active = false;
        assert!(!config.subscribes_to("license_activated"));
    }
}
