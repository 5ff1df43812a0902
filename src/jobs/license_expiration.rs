//! License expiration sweep: the only background job this service runs.
//!
//! Moves `valid` licenses whose `expires_at` has passed into `expired` and invalidates the
//! status cache for every license key affected. No event is placed on the event bus for the
//! sweep itself — cache invalidation here is a direct side effect of the job, not a published
//! lifecycle event.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::server::cache::StatusCache;
use crate::server::database::Database;

use super::JobError;

/// Runs the sweep once and returns how many licenses were transitioned to `expired`.
pub async fn run_license_expiration_check(db: &Database, cache: &StatusCache) -> Result<u64, JobError> {
    let now = Utc::now();
    debug!(at = %now, "checking for expired licenses");

    let license_key_ids = db.sweep_expired_licenses(now).await?;

    for license_key_id in &license_key_ids {
        match db.get_license_key(*license_key_id).await {
            Ok(Some(license_key)) => {
                if let Err(e) = cache.invalidate(&license_key.key_hash).await {
                    warn!(error = %e, %license_key_id, "failed to invalidate status cache after expiration sweep");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, %license_key_id, "failed to look up license key during expiration sweep"),
        }
    }

    let count = license_key_ids.len() as u64;
    if count > 0 {
        info!(count, "expired licenses swept");
    }
    Ok(count)
}
