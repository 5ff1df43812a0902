//! Product-scoped endpoints: activation, status, deactivation.
//!
//! All routes in this module require `X-License-Key`.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::InstanceType;
use crate::errors::LicenseError;
use crate::server::api_error::ApiError;
use crate::server::auth::LicenseKeyAuth;
use crate::server::event_bus::EventBus;
use crate::server::handlers::{idempotent, AppState};
use crate::server::seat_manager::ActivationOutcome;
use crate::server::validation::validate_instance_identifier;

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub product_slug: String,
    pub instance_identifier: String,
    pub instance_type: String,
    pub instance_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ActivationDTO {
    pub id: Uuid,
    pub license_id: Uuid,
    pub instance_identifier: String,
    pub instance_type: String,
    pub activated_at: DateTime<Utc>,
    pub reactivated: bool,
}

pub async fn activate(
    State(state): State<AppState>,
    LicenseKeyAuth { license_key }: LicenseKeyAuth,
    headers: HeaderMap,
    Json(body): Json<ActivateRequest>,
) -> Result<(StatusCode, Json<ActivationDTO>), ApiError> {
    validate_instance_identifier(&body.instance_identifier, "instance_identifier")
        .map_err(|e| LicenseError::Validation(e.to_string()))?;
    let instance_type: InstanceType = body.instance_type.parse().map_err(ApiError::from)?;

    let (status, value) = idempotent(&state, &headers, license_key.brand_id, || async {
        let product = state
            .db
            .get_product_by_slug(license_key.brand_id, &body.product_slug)
            .await?
            .ok_or(LicenseError::NotFound("product"))?;

        let licenses = state.db.list_licenses_by_license_key(license_key.id).await?;
        let license = licenses
            .into_iter()
            .find(|l| l.product_id == product.id)
            .ok_or(LicenseError::NotFound("license"))?;

        let (activation, outcome) = state
            .seat_manager
            .activate(
                &license,
                &body.instance_identifier,
                instance_type,
                body.instance_metadata.clone().unwrap_or_else(|| serde_json::json!({})),
            )
            .await?;

        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseActivated {
                activation_id: activation.id,
                license_id: license.id,
                license_key_id: license_key.id,
                brand_id: license_key.brand_id,
                instance_identifier: activation.instance_identifier.clone(),
            })
            .await;

        let dto = ActivationDTO {
            id: activation.id,
            license_id: activation.license_id,
            instance_identifier: activation.instance_identifier.clone(),
            instance_type: activation.instance_type.to_string(),
            activated_at: activation.activated_at,
            reactivated: outcome == ActivationOutcome::Reactivated,
        };
        let value = serde_json::to_value(&dto)
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::CREATED, value))
    })
    .await?;

    let dto: ActivationDTO = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(dto)))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub instance_identifier: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LicenseStatusDTO {
    pub license_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub status: String,
    pub is_valid: bool,
    pub seat_limit: u32,
    pub seats_used: u32,
    pub seats_remaining: u32,
    pub expires_at: Option<DateTime<Utc>>,
    /// Present only when the request supplied `instance_identifier`.
    pub instance_is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusResponse {
    pub customer_email: String,
    /// `true` if any license under the key is currently valid.
    pub is_valid: bool,
    pub total_seats_used: u32,
    pub total_seats_available: u32,
    pub licenses: Vec<LicenseStatusDTO>,
}

/// Read-through cache keyed by the license key's hash. The cached payload never reflects a
/// per-request `instance_identifier` filter (`instance_is_active` is computed fresh on every
/// call), so only the seat-count/validity portion is ever served stale.
pub async fn status(
    State(state): State<AppState>,
    LicenseKeyAuth { license_key }: LicenseKeyAuth,
    Query(params): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut response = match state.status_cache.get(&license_key.key_hash).await.ok().flatten() {
        Some(cached) => serde_json::from_value(cached)
            .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached status deserialize failed: {e}"))))?,
        None => {
            let licenses = state.db.list_licenses_by_license_key(license_key.id).await?;
            let mut entries = Vec::with_capacity(licenses.len());
            let mut total_seats_used = 0u32;
            let mut total_seats_available = 0u32;
            let mut any_valid = false;
            for license in &licenses {
                let product = state.db.get_product(license.product_id).await?.ok_or(LicenseError::NotFound("product"))?;
                let activations = state.db.list_activations_by_license(license.id).await?;
                let used = activations.iter().filter(|a| a.is_active).count() as u32;
                let remaining = license.seat_limit.saturating_sub(used);
                total_seats_used += used;
                total_seats_available += remaining;
                any_valid = any_valid || license.is_valid();
                entries.push(LicenseStatusDTO {
                    license_id: license.id,
                    product_id: license.product_id,
                    product_name: product.name,
                    status: license.status.to_string(),
                    is_valid: license.is_valid(),
                    seat_limit: license.seat_limit,
                    seats_used: used,
                    seats_remaining: remaining,
                    expires_at: license.expires_at,
                    instance_is_active: None,
                });
            }
            let computed = StatusResponse {
                customer_email: license_key.customer_email.clone(),
                is_valid: any_valid,
                total_seats_used,
                total_seats_available,
                licenses: entries,
            };
            let value = serde_json::to_value(&computed)
                .map_err(|e| LicenseError::Internal(format!("status serialize failed: {e}")))?;
            let _ = state.status_cache.set(&license_key.key_hash, &value).await;
            computed
        }
    };

    if let Some(instance_identifier) = &params.instance_identifier {
        for entry in &mut response.licenses {
            let activations = state.db.list_activations_by_license(entry.license_id).await?;
            entry.instance_is_active =
                Some(activations.iter().any(|a| a.is_active && &a.instance_identifier == instance_identifier));
        }
    }

    Ok(Json(response))
}

pub async fn deactivate(
    State(state): State<AppState>,
    LicenseKeyAuth { license_key }: LicenseKeyAuth,
    Path(activation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let activation = state.db.get_activation(activation_id).await?.ok_or(LicenseError::NotFound("activation"))?;
    let license = state.db.get_license(activation.license_id).await?.ok_or(LicenseError::NotFound("activation"))?;
    if license.license_key_id != license_key.id {
        return Err(LicenseError::Forbidden.into());
    }

    let changed = state.seat_manager.deactivate(license.id, &activation.instance_identifier).await?;
    if changed {
        state
            .event_bus
            .publish(crate::domain::DomainEvent::SeatDeactivated {
                activation_id: activation.id,
                license_id: license.id,
                license_key_id: license_key.id,
                brand_id: license_key.brand_id,
            })
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}
