//! Request handlers and the shared application state they close over.

pub mod brand;
pub mod health;
pub mod product;

use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use crate::server::api_error::ApiError;
use crate::server::cache::StatusCache;
use crate::server::database::Database;
use crate::server::event_bus::EventBus;
use crate::server::idempotency::IdempotencyStore;
use crate::server::rate_limit::RateLimiter;
use crate::server::seat_manager::SeatManager;

/// Everything a handler needs, constructed once at startup and cloned (cheaply, via `Arc`)
/// into every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub status_cache: Arc<StatusCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub event_bus: Arc<dyn EventBus>,
    pub idempotency: Arc<IdempotencyStore>,
    pub seat_manager: Arc<SeatManager>,
}

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Wraps a mutating handler body with idempotency-key replay: a repeated `(brand_id,
/// Idempotency-Key)` within the TTL returns the stored response verbatim without invoking
/// `compute` again.
pub async fn idempotent<F, Fut>(
    state: &AppState,
    headers: &HeaderMap,
    brand_id: Uuid,
    compute: F,
) -> Result<(StatusCode, serde_json::Value), ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(StatusCode, serde_json::Value), ApiError>>,
{
    let key = headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok());

    if let Some(key) = key {
        if let Some((status_code, body)) = state.idempotency.lookup(brand_id, key).await? {
            return Ok((StatusCode::from_u16(status_code).unwrap_or(StatusCode::OK), body));
        }
    }

    let (status, body) = compute().await?;

    if let Some(key) = key {
        state.idempotency.store(brand_id, key, status.as_u16(), body.clone()).await?;
    }

    Ok((status, body))
}
