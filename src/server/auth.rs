//! Request authentication extractors.
//!
//! Two credential types, never mixed within one route: brand-scoped operations (provisioning,
//! lifecycle changes, webhook config) require `X-API-Key`; product-scoped operations
//! (activation, status, deactivation) require `X-License-Key` via header or `license_key`
//! query parameter. Both resolve via a SHA-256 hash lookup followed by a constant-time
//! comparison against the stored hash.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use chrono::Utc;
use serde::Deserialize;

use crate::domain::{api_key, license_key, ApiKey, LicenseKey};
use crate::errors::LicenseError;
use crate::server::api_error::ApiError;
use crate::server::handlers::AppState;

pub struct ApiKeyAuth {
    pub key: ApiKey,
}

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or(LicenseError::Unauthorized)?;

        let hash = api_key::hash_key(raw);
        let key = state.db.get_api_key_by_hash(&hash).await?.ok_or(LicenseError::Unauthorized)?;

        if !api_key::verify(raw, &key.key_hash) {
            return Err(LicenseError::Unauthorized.into());
        }
        if key.is_expired() {
            return Err(LicenseError::Unauthorized.into());
        }

        state.db.touch_api_key_last_used(key.id, Utc::now()).await?;
        Ok(ApiKeyAuth { key })
    }
}

pub struct LicenseKeyAuth {
    pub license_key: LicenseKey,
}

#[derive(Debug, Deserialize)]
struct LicenseKeyQuery {
    license_key: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for LicenseKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get("X-License-Key").and_then(|v| v.to_str().ok()).map(str::to_string);
        let raw = match header {
            Some(raw) => raw,
            None => Query::<LicenseKeyQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|Query(q)| q.license_key)
                .ok_or(LicenseError::Unauthorized)?,
        };

        let hash = license_key::hash(&raw);
        let license_key = state.db.get_license_key_by_hash(&hash).await?.ok_or(LicenseError::Unauthorized)?;

        Ok(LicenseKeyAuth { license_key })
    }
}
