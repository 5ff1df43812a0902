//! Deterministic startup: open pools, wire the event bus, start the expirer, bind the listener.
//!
//! Nothing here depends on runtime CLI flags or environment-provided bootstrap secrets — the
//! whole sequence is reproducible from `WardenConfig` alone.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::WardenConfig;
use crate::errors::{LicenseError, LicenseResult};
use crate::jobs::{JobConfig, JobScheduler};
use crate::server::cache::{build_cache, StatusCache};
use crate::server::database::Database;
use crate::server::event_bus::{AuditLogHandler, CacheInvalidationHandler, EventBus, EventHandler, InProcessEventBus};
use crate::server::handlers::AppState;
use crate::server::idempotency::IdempotencyStore;
use crate::server::rate_limit::RateLimiter;
use crate::server::routes::build_router;
use crate::server::seat_manager::SeatManager;
use crate::server::webhook_dispatcher::WebhookDispatcher;

/// Everything `run` needs beyond the axum `Router` itself, so tests can assemble the pieces
/// without binding a real listener.
pub struct App {
    pub state: AppState,
    pub job_scheduler: JobScheduler,
}

/// Builds the database pool, cache, rate limiter, idempotency store, seat manager, event bus
/// (with the audit-log, cache-invalidation, and webhook handlers registered), and the
/// expiration-sweep job scheduler — but does not start the scheduler or bind a listener.
pub async fn build(config: &WardenConfig) -> LicenseResult<App> {
    let db = Database::connect(&config.database.db_type, &config.database.sqlite_url, &config.database.postgres_url).await?;

    let cache_backend = build_cache(&config.cache).await?;
    let status_cache = Arc::new(StatusCache::new(cache_backend.clone(), config.cache.status_ttl_secs));
    let rate_limiter = Arc::new(RateLimiter::new(cache_backend, &config.rate_limit));
    let idempotency = Arc::new(IdempotencyStore::new(db.clone(), &config.idempotency));
    let seat_manager = Arc::new(SeatManager::new(db.clone()));

    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(AuditLogHandler::new(db.clone())),
        Arc::new(CacheInvalidationHandler::new(db.clone(), status_cache.clone())),
        Arc::new(WebhookDispatcher::new(db.clone())),
    ];
    let local_bus: Arc<dyn EventBus> = Arc::new(InProcessEventBus::new(handlers));

    let event_bus: Arc<dyn EventBus> = if config.broker.enabled {
        #[cfg(feature = "broker")]
        {
            let broker: Arc<dyn EventBus> = Arc::new(
                crate::server::event_bus::BrokerEventBus::connect(&config.broker.amqp_url, &config.broker.exchange_name)
                    .await?,
            );
            Arc::new(crate::server::event_bus::CompositeEventBus::new(vec![local_bus, broker]))
        }
        #[cfg(not(feature = "broker"))]
        {
            return Err(LicenseError::Config(
                "broker.enabled is true but this binary was built without the 'broker' feature".to_string(),
            ));
        }
    } else {
        local_bus
    };

    let state = AppState {
        db: db.clone(),
        status_cache: status_cache.clone(),
        rate_limiter,
        event_bus,
        idempotency,
        seat_manager,
    };

    let job_scheduler = JobScheduler::new(db, status_cache, JobConfig::default()).await?;

    Ok(App { state, job_scheduler })
}

/// Starts the expiration-sweep scheduler and serves HTTP until the process is terminated.
pub async fn run(config: WardenConfig) -> LicenseResult<()> {
    let App { state, job_scheduler } = build(&config).await?;

    job_scheduler.start().await?;

    let router = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| LicenseError::Config(format!("invalid server.host/server.port: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LicenseError::Internal(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "warden listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| LicenseError::Internal(format!("server error: {e}")))?;

    Ok(())
}
