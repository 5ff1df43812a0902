//! Request logging middleware and health-check response shapes.
//!
//! Every request gets a correlation id: reused from an inbound `X-Correlation-ID` header when
//! present (so callers can thread their own trace through the service), generated otherwise.
//! The id is attached to the tracing span and echoed back on the response.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
pub const TRACE_ID_HEADER: &str = "X-Trace-ID";

pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tags every request with a correlation id, logs method/path/status/duration, and echoes the
/// id back on the response so a caller can correlate its own logs with ours.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(generate_correlation_id);

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let response = async move {
        info!("started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();
    {
        let _enter = span.enter();
        info!(
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "request completed"
        );
    }

    let (mut parts, body) = response.into_parts();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        parts.headers.insert(CORRELATION_ID_HEADER, value);
    }
    if status.is_server_error() {
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            parts.headers.insert(TRACE_ID_HEADER, value);
        }
    }

    Response::from_parts(parts, body)
}

/// `/health/` response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub db_type: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheHealth {
    pub connected: bool,
    pub backend: String,
}

impl HealthResponse {
    pub fn new(db: DatabaseHealth, cache: CacheHealth) -> Self {
        let status = if db.connected && cache.connected { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            service: "warden".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: db,
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_is_valid_uuid() {
        assert!(Uuid::parse_str(&generate_correlation_id()).is_ok());
    }

    #[test]
    fn health_response_degrades_when_either_dependency_is_down() {
        let healthy_db = DatabaseHealth { connected: true, db_type: "sqlite".to_string() };
        let down_cache = CacheHealth { connected: false, backend: "redis".to_string() };
        let resp = HealthResponse::new(healthy_db, down_cache);
        assert_eq!(resp.status, "degraded");
    }

    #[test]
    fn health_response_healthy_when_both_up() {
        let db = DatabaseHealth { connected: true, db_type: "sqlite".to_string() };
        let cache = CacheHealth { connected: true, backend: "memory".to_string() };
        let resp = HealthResponse::new(db, cache);
        assert_eq!(resp.status, "healthy");
    }
}
