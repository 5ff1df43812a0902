//! Server-side components for Warden.
//!
//! - `database`           → DB abstraction over SQLite/Postgres
//! - `cache`               → status cache / rate-limit counter backend (memory or Redis)
//! - `auth`                → `X-API-Key` / `X-License-Key` request extractors
//! - `rate_limit`          → per-identity fixed-window rate limiter
//! - `idempotency`         → `Idempotency-Key` replay store
//! - `event_bus`           → in-process/broker event bus plus the audit-log and cache-invalidation handlers
//! - `webhook_dispatcher`  → HMAC-signed webhook delivery, itself an `EventHandler`
//! - `seat_manager`        → activation/deactivation use case combining license gating and the seat-limit critical section
//! - `handlers`            → Axum HTTP handlers and `AppState`
//! - `routes`              → router assembly and middleware wiring
//! - `bootstrap`           → deterministic startup: pools, handlers, scheduler, listener
//! - `api_error`           → `ApiError`/`ErrorCode`, the HTTP error response shape
//! - `logging`             → request correlation-id middleware and health response shapes
//! - `validation`          → request field validators shared across handlers

pub mod api_error;
pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod database;
pub mod event_bus;
pub mod handlers;
pub mod idempotency;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod seat_manager;
pub mod validation;
pub mod webhook_dispatcher;

pub use api_error::{ApiError, ErrorCode};
pub use cache::{build_cache, Cache, StatusCache};
pub use database::Database;
pub use event_bus::{AuditLogHandler, CacheInvalidationHandler, EventBus, EventHandler, InProcessEventBus};
#[cfg(feature = "broker")]
pub use event_bus::BrokerEventBus;
pub use handlers::AppState;
pub use idempotency::IdempotencyStore;
pub use rate_limit::RateLimiter;
pub use routes::build_router;
pub use seat_manager::{ActivationOutcome, SeatManager};
pub use webhook_dispatcher::WebhookDispatcher;
