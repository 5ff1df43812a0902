//! Route table: wires handlers to paths and applies the per-identity rate limiter and request
//! logging middleware.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::domain::api_key::hash_key as identity_hash;
use crate::server::api_error::ApiError;
use crate::server::handlers::{brand, health, product, AppState};
use crate::server::logging::request_logging_middleware;

/// Rate-limits by the raw credential presented (`X-API-Key` or `X-License-Key`), hashed so the
/// cache never holds a usable secret. Requests without either header pass through untouched —
/// auth extraction rejects those before a handler ever runs.
async fn rate_limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identity = request
        .headers()
        .get("X-API-Key")
        .or_else(|| request.headers().get("X-License-Key"))
        .and_then(|v| v.to_str().ok())
        .map(identity_hash);

    if let Some(identity) = identity {
        if let Err(err) = state.rate_limiter.check(&identity).await {
            return ApiError::from(err).into_response();
        }
    }

    next.run(request).await
}

pub fn build_router(state: AppState) -> Router {
    let brand_routes = Router::new()
        .route("/api/v1/brand/licenses/provision", post(brand::provision))
        .route("/api/v1/brand/licenses/:license_id/renew", patch(brand::renew))
        .route("/api/v1/brand/licenses/:license_id/suspend", patch(brand::suspend))
        .route("/api/v1/brand/licenses/:license_id/resume", patch(brand::resume))
        .route("/api/v1/brand/licenses/:license_id/cancel", patch(brand::cancel))
        .route("/api/v1/brand/licenses", get(brand::list_by_email));

    let product_routes = Router::new()
        .route("/api/v1/product/activate", post(product::activate))
        .route("/api/v1/product/status", get(product::status))
        .route("/api/v1/product/activations/:activation_id", delete(product::deactivate));

    let health_routes = Router::new()
        .route("/health/", get(health::health))
        .route("/health/db/", get(health::health_db))
        .route("/health/cache/", get(health::health_cache))
        .route("/ready/", get(health::ready));

    brand_routes
        .merge(product_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .merge(health_routes)
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
