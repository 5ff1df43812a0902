//! Consumption of a seat on a concrete product instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LicenseError, LicenseResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    Url,
    Hostname,
    MachineId,
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceType::Url => "url",
            InstanceType::Hostname => "hostname",
            InstanceType::MachineId => "machine_id",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for InstanceType {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(InstanceType::Url),
            "hostname" => Ok(InstanceType::Hostname),
            "machine_id" => Ok(InstanceType::MachineId),
            other => Err(LicenseError::Validation(format!(
                "invalid instance_type '{other}', expected url, hostname, or machine_id"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    pub id: Uuid,
    pub license_id: Uuid,
    pub instance_identifier: String,
    pub instance_type: InstanceType,
    pub instance_metadata: serde_json::Value,
    pub activated_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Activation {
    pub fn create(
        license_id: Uuid,
        instance_identifier: String,
        instance_type: InstanceType,
        instance_metadata: serde_json::Value,
    ) -> LicenseResult<Self> {
        if instance_identifier.is_empty() || instance_identifier.len() > 500 {
            return Err(LicenseError::Validation(
                "instance_identifier must be 1..500 characters".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            license_id,
            instance_identifier,
            instance_type,
            instance_metadata,
            activated_at: now,
            last_checked_at: now,
            deactivated_at: None,
            is_active: true,
        })
    }

    /// Reuse an existing (inactive) row for reactivation: refresh timestamps and metadata,
    /// per the design decision that reactivation overwrites `activated_at`.
    pub fn reactivate(&mut self, instance_metadata: serde_json::Value) {
        let now = Utc::now();
        self.is_active = true;
        self.activated_at = now;
        self.last_checked_at = now;
        self.deactivated_at = None;
        self.instance_metadata = instance_metadata;
    }

    /// Idempotent: deactivating an already-inactive row is a no-op success.
    pub fn deactivate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.deactivated_at = Some(Utc::now());
        }
    }

    pub fn touch_checked(&mut self) {
        self.last_checked_at = Utc::now();
    }
}
