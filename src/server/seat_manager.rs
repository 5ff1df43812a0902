//! Seat activation use case: licensing rules (status gating) plus the concurrency-safe seat
//! count enforced by `Database::activate_seat`. This module owns the combination of the two;
//! the transactional mechanics themselves live in `database` since they're backend-specific.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Activation, InstanceType, License};
use crate::errors::LicenseResult;
use crate::server::database::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Created,
    Reactivated,
}

pub struct SeatManager {
    db: Arc<Database>,
}

impl SeatManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Activates `instance_identifier` against `license`, enforcing both the license's
    /// lifecycle gating (checked first, cheaply) and the seat limit (checked inside the
    /// serialized critical section).
    pub async fn activate(
        &self,
        license: &License,
        instance_identifier: &str,
        instance_type: InstanceType,
        instance_metadata: serde_json::Value,
    ) -> LicenseResult<(Activation, ActivationOutcome)> {
        license.check_activatable()?;

        let (activation, reactivated) = self
            .db
            .activate_seat(
                license.id,
                license.seat_limit,
                instance_identifier,
                instance_type,
                instance_metadata,
            )
            .await?;

        let outcome = if reactivated { ActivationOutcome::Reactivated } else { ActivationOutcome::Created };
        Ok((activation, outcome))
    }

    /// Idempotent: deactivating an instance that isn't active (or doesn't exist) still
    /// succeeds, returning `false` to indicate no row actually changed.
    pub async fn deactivate(&self, license_id: Uuid, instance_identifier: &str) -> LicenseResult<bool> {
        self.db.deactivate_seat(license_id, instance_identifier).await
    }
}
