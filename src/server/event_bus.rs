//! Event bus: one trait, two implementations.
//!
//! `InProcessEventBus` invokes every registered handler concurrently in the same process —
//! the default, and the only option without the `broker` feature. `BrokerEventBus` publishes to
//! an AMQP exchange instead, routed by `event.<event-name>`, for deployments that run the
//! consumer side out-of-process. Handlers themselves (audit log, cache invalidation, webhook
//! dispatch) don't know which implementation is in front of them.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use crate::domain::DomainEvent;
use crate::errors::LicenseResult;

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> LicenseResult<()>;
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Invokes every handler concurrently; a handler's failure is logged and does not block the
/// others or the caller. Publishing is fire-and-forget from the caller's perspective — the
/// state change has already committed by the time an event is published.
pub struct InProcessEventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl InProcessEventBus {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self { handlers }
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, event: DomainEvent) {
        let mut set = tokio::task::JoinSet::new();
        for handler in &self.handlers {
            let handler = handler.clone();
            let event = event.clone();
            set.spawn(async move {
                if let Err(e) = handler.handle(&event).await {
                    error!(event = event.name(), error = %e, "event handler failed");
                }
            });
        }
        while set.join_next().await.is_some() {}
    }
}

#[cfg(feature = "broker")]
pub struct BrokerEventBus {
    channel: lapin::Channel,
    exchange_name: String,
}

#[cfg(feature = "broker")]
impl BrokerEventBus {
    pub async fn connect(amqp_url: &str, exchange_name: &str) -> LicenseResult<Self> {
        use lapin::options::ExchangeDeclareOptions;
        use lapin::types::FieldTable;
        use lapin::{Connection, ConnectionProperties, ExchangeKind};

        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| crate::errors::LicenseError::Broker(format!("amqp connect failed: {e}")))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| crate::errors::LicenseError::Broker(format!("amqp channel failed: {e}")))?;
        channel
            .exchange_declare(
                exchange_name,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| crate::errors::LicenseError::Broker(format!("exchange declare failed: {e}")))?;

        Ok(Self { channel, exchange_name: exchange_name.to_string() })
    }
}

#[cfg(feature = "broker")]
#[async_trait]
impl EventBus for BrokerEventBus {
    async fn publish(&self, event: DomainEvent) {
        use lapin::options::BasicPublishOptions;
        use lapin::BasicProperties;

        let routing_key = format!("event.{}", event.name());
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to serialize event for broker publish");
                return;
            }
        };

        if let Err(e) = self
            .channel
            .basic_publish(
                &self.exchange_name,
                &routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await
        {
            error!(error = %e, routing_key = %routing_key, "failed to publish event to broker");
        }
    }
}

/// Fans a single `publish` out to every inner bus concurrently. Used when the broker is enabled:
/// events still drive the in-process audit-log/cache-invalidation/webhook handlers *and* get
/// published to the AMQP exchange for out-of-process subscribers.
pub struct CompositeEventBus {
    buses: Vec<Arc<dyn EventBus>>,
}

impl CompositeEventBus {
    pub fn new(buses: Vec<Arc<dyn EventBus>>) -> Self {
        Self { buses }
    }
}

#[async_trait]
impl EventBus for CompositeEventBus {
    async fn publish(&self, event: DomainEvent) {
        let mut set = tokio::task::JoinSet::new();
        for bus in &self.buses {
            let bus = bus.clone();
            let event = event.clone();
            set.spawn(async move { bus.publish(event).await });
        }
        while set.join_next().await.is_some() {}
    }
}

/// Persists an `AuditLog` row for every event. Always registered.
pub struct AuditLogHandler {
    db: Arc<crate::server::database::Database>,
}

impl AuditLogHandler {
    pub fn new(db: Arc<crate::server::database::Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    async fn handle(&self, event: &DomainEvent) -> LicenseResult<()> {
        let brand_id = event.brand_id();
        let (entity_type, entity_id) = entity_for(event);
        let changes = serde_json::to_value(event)
            .map_err(|e| crate::errors::LicenseError::Internal(format!("event serialize failed: {e}")))?;
        let log = crate::domain::AuditLog::record(brand_id, entity_type, entity_id, event.name(), changes);
        self.db.insert_audit_log(&log).await
    }
}

fn entity_for(event: &DomainEvent) -> (&'static str, uuid::Uuid) {
    match event {
        DomainEvent::LicenseKeyCreated { license_key_id, .. } => ("license_key", *license_key_id),
        DomainEvent::LicenseProvisioned { license_id, .. }
        | DomainEvent::LicenseRenewed { license_id, .. }
        | DomainEvent::LicenseSuspended { license_id, .. }
        | DomainEvent::LicenseResumed { license_id, .. }
        | DomainEvent::LicenseCancelled { license_id, .. } => ("license", *license_id),
        DomainEvent::LicenseActivated { activation_id, .. } | DomainEvent::SeatDeactivated { activation_id, .. } => {
            ("activation", *activation_id)
        }
    }
}

/// Invalidates the status cache entry for the affected license key. The cache key is derived
/// from the license key's hash, so this handler re-derives it via a lookup rather than storing
/// the hash on every event (events carry IDs, not raw keys).
pub struct CacheInvalidationHandler {
    db: Arc<crate::server::database::Database>,
    status_cache: Arc<crate::server::cache::StatusCache>,
}

impl CacheInvalidationHandler {
    pub fn new(db: Arc<crate::server::database::Database>, status_cache: Arc<crate::server::cache::StatusCache>) -> Self {
        Self { db, status_cache }
    }
}

#[async_trait]
impl EventHandler for CacheInvalidationHandler {
    async fn handle(&self, event: &DomainEvent) -> LicenseResult<()> {
        let Some(license_key_id) = event.license_key_id() else {
            return Ok(());
        };
        if let Some(license_key) = self.db.get_license_key(license_key_id).await? {
            self.status_cache.invalidate(&license_key.key_hash).await?;
        }
        Ok(())
    }
}
