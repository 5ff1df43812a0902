//! Shared harness for integration tests: an isolated in-memory server per test, never touching
//! the process-wide configuration singleton so tests can run concurrently without clobbering
//! each other's database.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use warden::config::{CacheConfig, IdempotencyConfig, RateLimitConfig};
use warden::domain::api_key::generate as generate_api_key;
use warden::domain::{ApiKeyScope, Brand, Product};
use warden::server::cache::{build_cache, StatusCache};
use warden::server::database::Database;
use warden::server::handlers::AppState;
use warden::server::idempotency::IdempotencyStore;
use warden::server::routes::build_router;
use warden::server::seat_manager::SeatManager;

/// A running server plus the brand/product/credentials already provisioned against it.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: Arc<Database>,
    pub status_cache: Arc<StatusCache>,
    pub brand: Brand,
    pub product: Product,
    pub full_api_key: String,
    pub read_api_key: String,
}

/// Spins up a fresh in-memory SQLite-backed server with one brand, one product, and one
/// full-scope + one read-scope API key already provisioned. Rate limiting is disabled so
/// tests can fire many requests without tripping the fixed-window limiter.
pub async fn spawn() -> TestServer {
    let db = Database::connect("sqlite", "sqlite::memory:", "")
        .await
        .expect("in-memory sqlite database should connect and migrate");

    let cache_backend = build_cache(&CacheConfig { backend: "memory".to_string(), ..Default::default() })
        .await
        .expect("memory cache backend never fails to build");
    let status_cache = Arc::new(StatusCache::new(cache_backend.clone(), 300));
    let rate_limiter = Arc::new(warden::server::rate_limit::RateLimiter::new(
        cache_backend,
        &RateLimitConfig { enabled: false, ..Default::default() },
    ));
    let idempotency = Arc::new(IdempotencyStore::new(db.clone(), &IdempotencyConfig::default()));
    let seat_manager = Arc::new(SeatManager::new(db.clone()));

    let handlers: Vec<Arc<dyn warden::server::event_bus::EventHandler>> = vec![
        Arc::new(warden::server::event_bus::AuditLogHandler::new(db.clone())),
        Arc::new(warden::server::event_bus::CacheInvalidationHandler::new(db.clone(), status_cache.clone())),
        Arc::new(warden::server::webhook_dispatcher::WebhookDispatcher::new(db.clone())),
    ];
    let event_bus: Arc<dyn warden::server::event_bus::EventBus> =
        Arc::new(warden::server::event_bus::InProcessEventBus::new(handlers));

    let state = AppState {
        db: db.clone(),
        status_cache: status_cache.clone(),
        rate_limiter,
        event_bus,
        idempotency,
        seat_manager,
    };

    let brand = Brand::create("Acme Inc".to_string(), format!("acme-{}", Uuid::new_v4()), "ACME".to_string())
        .expect("valid brand fields");
    db.create_brand(&brand).await.expect("brand insert should succeed");

    let product = Product::create(brand.id, "Pro Plan".to_string(), "pro".to_string()).expect("valid product fields");
    db.create_product(&product).await.expect("product insert should succeed");

    let (full_api_key, full_record) = generate_api_key(brand.id, ApiKeyScope::Full, None);
    db.create_api_key(&full_record).await.expect("api key insert should succeed");

    let (read_api_key, read_record) = generate_api_key(brand.id, ApiKeyScope::Read, None);
    db.create_api_key(&read_record).await.expect("api key insert should succeed");

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("binding an ephemeral port should never fail");
    let addr = listener.local_addr().expect("bound listener has a local address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server should not error while serving");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        db,
        status_cache,
        brand,
        product,
        full_api_key,
        read_api_key,
    }
}

/// `chrono::Utc::now() + secs` as an RFC3339 string suitable for JSON request bodies.
pub fn future_rfc3339(secs: i64) -> String {
    (Utc::now() + chrono::Duration::seconds(secs)).to_rfc3339()
}
