//! Pure domain entities and their invariants.
//!
//! Nothing in this module talks to a database, a cache, or the network. Each type owns its
//! own validation and lifecycle rules; persistence is a separate concern handled by
//! `server::database`.

pub mod activation;
pub mod api_key;
pub mod audit_log;
pub mod brand;
pub mod events;
pub mod idempotency;
pub mod license;
pub mod license_key;
pub mod product;
pub mod webhook_config;

pub use activation::{Activation, InstanceType};
pub use api_key::{ApiKey, ApiKeyScope};
pub use audit_log::AuditLog;
pub use brand::Brand;
pub use events::DomainEvent;
pub use idempotency::IdempotencyRecord;
pub use license::{License, LicenseStatus};
pub use license_key::LicenseKey;
pub use product::Product;
pub use webhook_config::WebhookConfig;
