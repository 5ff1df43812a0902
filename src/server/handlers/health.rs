//! Unauthenticated health and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::server::handlers::AppState;
use crate::server::logging::{CacheHealth, DatabaseHealth, HealthResponse};

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = state.db.ping().await;
    let cache_ok = state.status_cache.ping().await;
    let body = HealthResponse::new(
        DatabaseHealth { connected: db_ok, db_type: state.db.db_type().to_string() },
        CacheHealth { connected: cache_ok, backend: state.status_cache.backend_name().to_string() },
    );
    let status = if db_ok && cache_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

pub async fn health_db(State(state): State<AppState>) -> StatusCode {
    if state.db.ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn health_cache(State(state): State<AppState>) -> StatusCode {
    if state.status_cache.ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Readiness: the service can actually serve traffic, i.e. both dependencies are reachable.
pub async fn ready(State(state): State<AppState>) -> StatusCode {
    let db_ok = state.db.ping().await;
    let cache_ok = state.status_cache.ping().await;
    if db_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
