//! Webhook delivery with HMAC-SHA256 signing and bounded exponential backoff retry.
//!
//! Grounded on the same shape as a typical delivery service: canonical (sorted-key) JSON
//! payload, `X-Webhook-Signature` header, retry with `2^attempt` second backoff up to
//! `max_retries`. Dispatch never blocks the request that triggered it — it runs as an
//! `EventHandler` invoked by the event bus after the state change has already committed.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::DomainEvent;
use crate::errors::LicenseResult;
use crate::server::database::Database;
use crate::server::event_bus::EventHandler;

type HmacSha256 = Hmac<Sha256>;

fn sign(payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub struct WebhookDispatcher {
    db: Arc<Database>,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db, client: reqwest::Client::new() }
    }

    async fn deliver(&self, url: &str, secret: &str, event_type: &str, data: &serde_json::Value, timeout: Duration, max_retries: u32) {
        let envelope = serde_json::json!({
            "event_type": event_type,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "data": data,
        });
        // Canonical (sorted-key) form, so the signature is reproducible regardless of field
        // insertion order on either side.
        let canonical = match canonicalize(&envelope) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to canonicalize webhook payload");
                return;
            }
        };
        let signature = sign(&canonical, secret);

        for attempt in 0..=max_retries {
            let result = self
                .client
                .post(url)
                .timeout(timeout)
                .header("Content-Type", "application/json")
                .header("User-Agent", "License-Service-Webhook/1.0")
                .header("X-Webhook-Signature", &signature)
                .header("X-Webhook-Event", event_type)
                .body(canonical.clone())
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    info!(url, event_type, attempt, "webhook delivered");
                    return;
                }
                Ok(resp) => {
                    warn!(url, event_type, attempt, status = %resp.status(), "webhook delivery rejected");
                }
                Err(e) => {
                    warn!(url, event_type, attempt, error = %e, "webhook delivery failed");
                }
            }

            if attempt < max_retries {
                let delay = Duration::from_secs(2u64.saturating_pow(attempt));
                tokio::time::sleep(delay).await;
            }
        }

        warn!(url, event_type, max_retries, "webhook delivery exhausted retries");
    }
}

/// Serializes a `serde_json::Value` with object keys sorted, matching the reference
/// implementation's `json.dumps(..., sort_keys=True)`.
fn canonicalize(value: &serde_json::Value) -> serde_json::Result<String> {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut sorted = serde_json::Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    sorted.insert(key.clone(), sort(&map[key]));
                }
                serde_json::Value::Object(sorted)
            }
            serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value))
}

#[async_trait]
impl EventHandler for WebhookDispatcher {
    async fn handle(&self, event: &DomainEvent) -> LicenseResult<()> {
        let brand_id = event.brand_id();
        let configs = self.db.list_webhook_configs_by_brand(brand_id).await?;
        let payload = serde_json::to_value(event)
            .map_err(|e| crate::errors::LicenseError::Internal(format!("event serialize failed: {e}")))?;
        let data = payload.get("data").cloned().unwrap_or(payload);

        for config in configs {
            if !config.subscribes_to(event.name()) {
                continue;
            }
            self.deliver(
                &config.url,
                &config.secret,
                event.name(),
                &data,
                Duration::from_secs(config.timeout_seconds),
                config.max_retries,
            )
            .await;
        }
        Ok(())
    }
}
