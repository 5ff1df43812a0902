//! Brand-scoped endpoints: provisioning and license lifecycle management.
//!
//! All routes in this module require `X-API-Key` with `Full` scope, except listing, which
//! also accepts `Read`.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ApiKeyScope, License, LicenseKey};
use crate::errors::{LicenseError, LicenseResult};
use crate::license_key::{generate_license_key, LicenseKeyConfig};
use crate::server::api_error::ApiError;
use crate::server::auth::ApiKeyAuth;
use crate::server::event_bus::EventBus;
use crate::server::handlers::{idempotent, AppState};
use crate::server::validation::validate_email;

fn require_full_scope(key: &crate::domain::ApiKey) -> Result<(), ApiError> {
    if key.scope == ApiKeyScope::Full {
        Ok(())
    } else {
        Err(LicenseError::Forbidden.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub customer_email: String,
    pub products: Vec<Uuid>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub max_seats: Option<u32>,
}

#[derive(Debug, Serialize, Clone)]
pub struct LicenseKeyDTO {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub key: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&LicenseKey> for LicenseKeyDTO {
    fn from(lk: &LicenseKey) -> Self {
        Self { id: lk.id, brand_id: lk.brand_id, key: lk.key.clone(), customer_email: lk.customer_email.clone(), created_at: lk.created_at }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct LicenseDTO {
    pub id: Uuid,
    pub license_key_id: Uuid,
    pub product_id: Uuid,
    pub status: String,
    pub seat_limit: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&License> for LicenseDTO {
    fn from(l: &License) -> Self {
        Self {
            id: l.id,
            license_key_id: l.license_key_id,
            product_id: l.product_id,
            status: l.status.to_string(),
            seat_limit: l.seat_limit,
            expires_at: l.expires_at,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ProvisionResponse {
    pub license_key: LicenseKeyDTO,
    pub licenses: Vec<LicenseDTO>,
}

/// Generates a license key unique under the brand's prefix, retrying on the vanishingly
/// unlikely collision (the charset gives ~31^16 combinations per prefix).
async fn generate_unique_key(state: &AppState, prefix: &str) -> LicenseResult<String> {
    let config = LicenseKeyConfig::new(prefix);
    for _ in 0..5 {
        let candidate = generate_license_key(&config);
        let hash = crate::domain::license_key::hash(&candidate);
        if !state.db.license_key_hash_exists(&hash).await? {
            return Ok(candidate);
        }
    }
    Err(LicenseError::Internal("exhausted license key generation attempts".to_string()))
}

pub async fn provision(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    headers: HeaderMap,
    Json(body): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>), ApiError> {
    require_full_scope(&key)?;
    validate_email(&body.customer_email, "customer_email").map_err(|e| LicenseError::Validation(e.to_string()))?;
    if body.products.is_empty() {
        return Err(LicenseError::Validation("products must contain at least one product id".to_string()).into());
    }
    let seat_limit = body.max_seats.unwrap_or(1);

    let (status, value) = idempotent(&state, &headers, key.brand_id, || async {
        let brand = state.db.get_brand(key.brand_id).await?.ok_or(LicenseError::NotFound("brand"))?;

        let mut products = Vec::with_capacity(body.products.len());
        for product_id in &body.products {
            let product = state.db.get_product(*product_id).await?.ok_or(LicenseError::NotFound("product"))?;
            if product.brand_id != brand.id {
                return Err(LicenseError::Validation(format!("product {product_id} does not belong to this brand")).into());
            }
            products.push(product);
        }

        let raw_key = generate_unique_key(&state, &brand.prefix).await?;
        let license_key = LicenseKey::new(brand.id, raw_key, body.customer_email.clone())?;

        let mut licenses = Vec::with_capacity(products.len());
        for product in &products {
            let license = License::create(license_key.id, product.id, seat_limit, body.expiration_date)?;
            licenses.push(license);
        }
        // Single transaction: either the key and every requested license land, or none do.
        state.db.create_license_key_with_licenses(&license_key, &licenses).await?;

        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseKeyCreated {
                license_key_id: license_key.id,
                brand_id: brand.id,
                customer_email: license_key.customer_email.clone(),
            })
            .await;
        for license in &licenses {
            state
                .event_bus
                .publish(crate::domain::DomainEvent::LicenseProvisioned {
                    license_id: license.id,
                    license_key_id: license_key.id,
                    brand_id: brand.id,
                    product_id: license.product_id,
                })
                .await;
        }

        let response = ProvisionResponse {
            license_key: LicenseKeyDTO::from(&license_key),
            licenses: licenses.iter().map(LicenseDTO::from).collect(),
        };
        let value = serde_json::to_value(&response)
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::CREATED, value))
    })
    .await?;

    let response: ProvisionResponse = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(response)))
}

async fn load_owned_license(state: &AppState, key: &crate::domain::ApiKey, license_id: Uuid) -> Result<License, ApiError> {
    let license = state.db.get_license(license_id).await?.ok_or(LicenseError::NotFound("license"))?;
    let license_key = state.db.get_license_key(license.license_key_id).await?.ok_or(LicenseError::NotFound("license"))?;
    if license_key.brand_id != key.brand_id {
        return Err(LicenseError::Forbidden.into());
    }
    Ok(license)
}

#[derive(Debug, Deserialize)]
pub struct RenewRequest {
    pub expiration_date: Option<DateTime<Utc>>,
}

pub async fn renew(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    Path(license_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RenewRequest>,
) -> Result<(StatusCode, Json<LicenseDTO>), ApiError> {
    require_full_scope(&key)?;
    let (status, value) = idempotent(&state, &headers, key.brand_id, || async {
        let mut license = load_owned_license(&state, &key, license_id).await?;
        license.renew(body.expiration_date)?;
        state.db.update_license(&license).await?;
        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseRenewed {
                license_id: license.id,
                license_key_id: license.license_key_id,
                brand_id: key.brand_id,
                expires_at: license.expires_at,
            })
            .await;
        let value = serde_json::to_value(LicenseDTO::from(&license))
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::OK, value))
    })
    .await?;
    let dto: LicenseDTO = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(dto)))
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    #[allow(dead_code)]
    pub reason: Option<String>,
}

pub async fn suspend(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    Path(license_id): Path<Uuid>,
    headers: HeaderMap,
    Json(_body): Json<ReasonRequest>,
) -> Result<(StatusCode, Json<LicenseDTO>), ApiError> {
    require_full_scope(&key)?;
    let (status, value) = idempotent(&state, &headers, key.brand_id, || async {
        let mut license = load_owned_license(&state, &key, license_id).await?;
        license.suspend()?;
        state.db.update_license(&license).await?;
        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseSuspended {
                license_id: license.id,
                license_key_id: license.license_key_id,
                brand_id: key.brand_id,
            })
            .await;
        let value = serde_json::to_value(LicenseDTO::from(&license))
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::OK, value))
    })
    .await?;
    let dto: LicenseDTO = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(dto)))
}

pub async fn resume(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    Path(license_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<LicenseDTO>), ApiError> {
    require_full_scope(&key)?;
    let (status, value) = idempotent(&state, &headers, key.brand_id, || async {
        let mut license = load_owned_license(&state, &key, license_id).await?;
        license.resume()?;
        state.db.update_license(&license).await?;
        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseResumed {
                license_id: license.id,
                license_key_id: license.license_key_id,
                brand_id: key.brand_id,
            })
            .await;
        let value = serde_json::to_value(LicenseDTO::from(&license))
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::OK, value))
    })
    .await?;
    let dto: LicenseDTO = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(dto)))
}

pub async fn cancel(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    Path(license_id): Path<Uuid>,
    headers: HeaderMap,
    Json(_body): Json<ReasonRequest>,
) -> Result<(StatusCode, Json<LicenseDTO>), ApiError> {
    require_full_scope(&key)?;
    let (status, value) = idempotent(&state, &headers, key.brand_id, || async {
        let mut license = load_owned_license(&state, &key, license_id).await?;
        license.cancel()?;
        state.db.update_license(&license).await?;
        state
            .event_bus
            .publish(crate::domain::DomainEvent::LicenseCancelled {
                license_id: license.id,
                license_key_id: license.license_key_id,
                brand_id: key.brand_id,
            })
            .await;
        let value = serde_json::to_value(LicenseDTO::from(&license))
            .map_err(|e| LicenseError::Internal(format!("response serialize failed: {e}")))?;
        Ok::<_, ApiError>((StatusCode::OK, value))
    })
    .await?;
    let dto: LicenseDTO = serde_json::from_value(value)
        .map_err(|e| ApiError::from(LicenseError::Internal(format!("cached response deserialize failed: {e}"))))?;
    Ok((status, Json(dto)))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LicenseKeyWithLicenses {
    #[serde(flatten)]
    pub license_key: LicenseKeyDTO,
    pub licenses: Vec<LicenseDTO>,
}

pub async fn list_by_email(
    State(state): State<AppState>,
    ApiKeyAuth { key }: ApiKeyAuth,
    Query(params): Query<EmailQuery>,
) -> Result<Json<Vec<LicenseKeyWithLicenses>>, ApiError> {
    let license_keys = state.db.list_license_keys_by_email(key.brand_id, &params.email).await?;
    let mut results = Vec::with_capacity(license_keys.len());
    for license_key in &license_keys {
        let licenses = state.db.list_licenses_by_license_key(license_key.id).await?;
        results.push(LicenseKeyWithLicenses {
            license_key: LicenseKeyDTO::from(license_key),
            licenses: licenses.iter().map(LicenseDTO::from).collect(),
        });
    }
    Ok(Json(results))
}
