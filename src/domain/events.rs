//! Domain events published after a successful state change commits.
//!
//! Events carry enough data for handlers (audit log, cache invalidation, webhook dispatch) to
//! act without re-querying the repository. The event bus interface (`EventBus`) is implemented
//! twice — in-process and broker-backed — see `server::event_bus`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case", content = "data")]
pub enum DomainEvent {
    LicenseKeyCreated {
        license_key_id: Uuid,
        brand_id: Uuid,
        customer_email: String,
    },
    LicenseProvisioned {
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
        product_id: Uuid,
    },
    LicenseRenewed {
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    },
    LicenseSuspended {
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
    },
    LicenseResumed {
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
    },
    LicenseCancelled {
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
    },
    LicenseActivated {
        activation_id: Uuid,
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
        instance_identifier: String,
    },
    SeatDeactivated {
        activation_id: Uuid,
        license_id: Uuid,
        license_key_id: Uuid,
        brand_id: Uuid,
    },
}

impl DomainEvent {
    /// Lowercase event name, used both as the wire `event_type` and as the broker routing
    /// key suffix (`event.<name>`).
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::LicenseKeyCreated { .. } => "license_key_created",
            DomainEvent::LicenseProvisioned { .. } => "license_provisioned",
            DomainEvent::LicenseRenewed { .. } => "license_renewed",
            DomainEvent::LicenseSuspended { .. } => "license_suspended",
            DomainEvent::LicenseResumed { .. } => "license_resumed",
            DomainEvent::LicenseCancelled { .. } => "license_cancelled",
            DomainEvent::LicenseActivated { .. } => "license_activated",
            DomainEvent::SeatDeactivated { .. } => "seat_deactivated",
        }
    }

    pub fn brand_id(&self) -> Uuid {
        match self {
            DomainEvent::LicenseKeyCreated { brand_id, .. }
            | DomainEvent::LicenseProvisioned { brand_id, .. }
            | DomainEvent::LicenseRenewed { brand_id, .. }
            | DomainEvent::LicenseSuspended { brand_id, .. }
            | DomainEvent::LicenseResumed { brand_id, .. }
            | DomainEvent::LicenseCancelled { brand_id, .. }
            | DomainEvent::LicenseActivated { brand_id, .. }
            | DomainEvent::SeatDeactivated { brand_id, .. } => *brand_id,
        }
    }

    /// The license key whose cached status should be invalidated, if this event affects one.
    pub fn license_key_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::LicenseKeyCreated { license_key_id, .. }
            | DomainEvent::LicenseProvisioned { license_key_id, .. }
            | DomainEvent::LicenseRenewed { license_key_id, .. }
            | DomainEvent::LicenseSuspended { license_key_id, .. }
            | DomainEvent::LicenseResumed { license_key_id, .. }
            | DomainEvent::LicenseCancelled { license_key_id, .. }
            | DomainEvent::LicenseActivated { license_key_id, .. }
            | DomainEvent::SeatDeactivated { license_key_id, .. } => Some(*license_key_id),
        }
    }
}
