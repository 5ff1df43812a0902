//! Persistence layer: a `Database` enum over SQLite/Postgres pools, plus one repository
//! method per operation the handlers need. Row structs mirror the table schema; conversion
//! into the `domain` types lives next to each row struct rather than deriving `FromRow`
//! directly on the domain types, since several columns (status, scope, instance_type) are
//! stored as TEXT and need a parse step.

use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::get_config;
use crate::domain::{
    Activation, ApiKey, ApiKeyScope, AuditLog, Brand, InstanceType, License, LicenseKey,
    LicenseStatus, Product, WebhookConfig,
};
use crate::errors::{LicenseError, LicenseResult};

fn scope_to_str(scope: ApiKeyScope) -> &'static str {
    match scope {
        ApiKeyScope::Full => "full",
        ApiKeyScope::Read => "read",
    }
}

fn scope_from_str(s: &str) -> LicenseResult<ApiKeyScope> {
    match s {
        "full" => Ok(ApiKeyScope::Full),
        "read" => Ok(ApiKeyScope::Read),
        other => Err(LicenseError::Internal(format!("unknown api key scope '{other}'"))),
    }
}

/// Per-license serialization for the SQLite backend, which has no row-level locking.
/// Postgres uses `SELECT ... FOR UPDATE` instead; see `activate_seat`.
#[derive(Default)]
struct LicenseLocks {
    locks: std::sync::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl LicenseLocks {
    fn get(&self, license_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("license lock registry poisoned");
        locks.entry(license_id).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool, LicenseLocks),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Initialize the database connection based on the process configuration.
    pub async fn new() -> LicenseResult<Arc<Self>> {
        let config = get_config()?;
        let db_config = &config.database;
        Self::connect(&db_config.db_type, &db_config.sqlite_url, &db_config.postgres_url).await
    }

    /// Opens a pool for `db_type` (`"sqlite"` or `"postgres"`) and runs migrations against it.
    ///
    /// Takes its connection parameters directly rather than through [`crate::config::get_config`],
    /// so callers that need a database without the process-wide configuration singleton — tests
    /// building an isolated in-memory database chief among them — can call it directly.
    pub async fn connect(db_type: &str, sqlite_url: &str, postgres_url: &str) -> LicenseResult<Arc<Self>> {
        match db_type {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(sqlite_url).await.map_err(|e| {
                    error!("failed to connect to SQLite: {e}");
                    LicenseError::Database(format!("failed to connect to SQLite: {e}"))
                })?;
                sqlx::migrate!("./migrations/sqlite").run(&pool).await.map_err(|e| {
                    error!("failed to run SQLite migrations: {e}");
                    LicenseError::Database(format!("failed to run migrations: {e}"))
                })?;
                Ok(Arc::new(Database::SQLite(pool, LicenseLocks::default())))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(LicenseError::Config(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(postgres_url).await.map_err(|e| {
                    error!("failed to connect to PostgreSQL: {e}");
                    LicenseError::Database(format!("failed to connect to PostgreSQL: {e}"))
                })?;
                sqlx::migrate!("./migrations/postgres").run(&pool).await.map_err(|e| {
                    error!("failed to run PostgreSQL migrations: {e}");
                    LicenseError::Database(format!("failed to run migrations: {e}"))
                })?;
                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(LicenseError::Config(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(LicenseError::Config(format!("unsupported database type: {other}"))),
        }
    }

    /// `true` when a trivial query round-trips. Used by the health/readiness endpoints.
    pub async fn ping(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => query("SELECT 1").execute(pool).await.is_ok(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await.is_ok(),
        }
    }

    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(..) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(..) => "postgres",
        }
    }

    // ===================================================================
    // Brand
    // ===================================================================

    pub async fn create_brand(&self, brand: &Brand) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query("INSERT INTO brands (id, name, slug, prefix, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
                    .bind(brand.id)
                    .bind(&brand.name)
                    .bind(&brand.slug)
                    .bind(&brand.prefix)
                    .bind(brand.created_at)
                    .bind(brand.updated_at)
                    .execute(pool)
                    .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("INSERT INTO brands (id, name, slug, prefix, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
                    .bind(brand.id)
                    .bind(&brand.name)
                    .bind(&brand.slug)
                    .bind(&brand.prefix)
                    .bind(brand.created_at)
                    .bind(brand.updated_at)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn get_brand(&self, id: Uuid) -> LicenseResult<Option<Brand>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, BrandRow>("SELECT * FROM brands WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(Brand::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, BrandRow>("SELECT * FROM brands WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(Brand::try_from).transpose()
            }
        }
    }

    pub async fn get_brand_by_slug(&self, slug: &str) -> LicenseResult<Option<Brand>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, BrandRow>("SELECT * FROM brands WHERE slug = ?")
                    .bind(slug)
                    .fetch_optional(pool)
                    .await?;
                row.map(Brand::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, BrandRow>("SELECT * FROM brands WHERE slug = $1")
                    .bind(slug)
                    .fetch_optional(pool)
                    .await?;
                row.map(Brand::try_from).transpose()
            }
        }
    }

    pub async fn update_brand(&self, brand: &Brand) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query("UPDATE brands SET name = ?, updated_at = ? WHERE id = ?")
                    .bind(&brand.name)
                    .bind(brand.updated_at)
                    .bind(brand.id)
                    .execute(pool)
                    .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("UPDATE brands SET name = $1, updated_at = $2 WHERE id = $3")
                    .bind(&brand.name)
                    .bind(brand.updated_at)
                    .bind(brand.id)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    // ===================================================================
    // Product
    // ===================================================================

    pub async fn create_product(&self, product: &Product) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query("INSERT INTO products (id, brand_id, name, slug, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
                    .bind(product.id)
                    .bind(product.brand_id)
                    .bind(&product.name)
                    .bind(&product.slug)
                    .bind(product.created_at)
                    .bind(product.updated_at)
                    .execute(pool)
                    .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("INSERT INTO products (id, brand_id, name, slug, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
                    .bind(product.id)
                    .bind(product.brand_id)
                    .bind(&product.name)
                    .bind(&product.slug)
                    .bind(product.created_at)
                    .bind(product.updated_at)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn get_product(&self, id: Uuid) -> LicenseResult<Option<Product>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(Product::from))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(Product::from))
            }
        }
    }

    pub async fn get_product_by_slug(&self, brand_id: Uuid, slug: &str) -> LicenseResult<Option<Product>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, ProductRow>(
                    "SELECT * FROM products WHERE brand_id = ? AND slug = ?",
                )
                .bind(brand_id)
                .bind(slug)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(Product::from))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, ProductRow>(
                    "SELECT * FROM products WHERE brand_id = $1 AND slug = $2",
                )
                .bind(brand_id)
                .bind(slug)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(Product::from))
            }
        }
    }

    // ===================================================================
    // ApiKey
    // ===================================================================

    pub async fn create_api_key(&self, key: &ApiKey) -> LicenseResult<()> {
        let scope = scope_to_str(key.scope);
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO api_keys (id, brand_id, key_prefix, key_hash, scope, expires_at, last_used_at, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key_prefix)
                .bind(&key.key_hash)
                .bind(scope)
                .bind(key.expires_at)
                .bind(key.last_used_at)
                .bind(key.created_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO api_keys (id, brand_id, key_prefix, key_hash, scope, expires_at, last_used_at, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key_prefix)
                .bind(&key.key_hash)
                .bind(scope)
                .bind(key.expires_at)
                .bind(key.last_used_at)
                .bind(key.created_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Looked up on every request carrying `X-API-Key`; indexed on `key_hash`.
    pub async fn get_api_key_by_hash(&self, key_hash: &str) -> LicenseResult<Option<ApiKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE key_hash = ?")
                    .bind(key_hash)
                    .fetch_optional(pool)
                    .await?;
                row.map(ApiKey::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE key_hash = $1")
                    .bind(key_hash)
                    .fetch_optional(pool)
                    .await?;
                row.map(ApiKey::try_from).transpose()
            }
        }
    }

    pub async fn touch_api_key_last_used(&self, id: Uuid, at: DateTime<Utc>) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
                    .bind(at)
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
                    .bind(at)
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    // ===================================================================
    // LicenseKey
    // ===================================================================

    pub async fn create_license_key(&self, key: &LicenseKey) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO license_keys (id, brand_id, key, key_hash, customer_email, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key)
                .bind(&key.key_hash)
                .bind(&key.customer_email)
                .bind(key.created_at)
                .bind(key.updated_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO license_keys (id, brand_id, key, key_hash, customer_email, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key)
                .bind(&key.key_hash)
                .bind(&key.customer_email)
                .bind(key.created_at)
                .bind(key.updated_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Inserts the license key and every license under it in a single transaction: either all
    /// of it lands or none of it does, so a mid-batch failure never leaves a key with a partial
    /// set of licenses.
    pub async fn create_license_key_with_licenses(
        &self,
        key: &LicenseKey,
        licenses: &[License],
    ) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let mut tx = pool.begin().await?;
                query(
                    "INSERT INTO license_keys (id, brand_id, key, key_hash, customer_email, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key)
                .bind(&key.key_hash)
                .bind(&key.customer_email)
                .bind(key.created_at)
                .bind(key.updated_at)
                .execute(&mut *tx)
                .await?;

                for license in licenses {
                    let status = license.status.to_string();
                    query(
                        "INSERT INTO licenses (id, license_key_id, product_id, status, seat_limit, expires_at, created_at, updated_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(license.id)
                    .bind(license.license_key_id)
                    .bind(license.product_id)
                    .bind(status)
                    .bind(license.seat_limit as i64)
                    .bind(license.expires_at)
                    .bind(license.created_at)
                    .bind(license.updated_at)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                query(
                    "INSERT INTO license_keys (id, brand_id, key, key_hash, customer_email, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(key.id)
                .bind(key.brand_id)
                .bind(&key.key)
                .bind(&key.key_hash)
                .bind(&key.customer_email)
                .bind(key.created_at)
                .bind(key.updated_at)
                .execute(&mut *tx)
                .await?;

                for license in licenses {
                    let status = license.status.to_string();
                    query(
                        "INSERT INTO licenses (id, license_key_id, product_id, status, seat_limit, expires_at, created_at, updated_at)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                    )
                    .bind(license.id)
                    .bind(license.license_key_id)
                    .bind(license.product_id)
                    .bind(status)
                    .bind(license.seat_limit as i64)
                    .bind(license.expires_at)
                    .bind(license.created_at)
                    .bind(license.updated_at)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await?;
            }
        }
        Ok(())
    }

    pub async fn license_key_hash_exists(&self, key_hash: &str) -> LicenseResult<bool> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row: Option<(i64,)> =
                    query_as("SELECT 1 FROM license_keys WHERE key_hash = ?")
                        .bind(key_hash)
                        .fetch_optional(pool)
                        .await?;
                Ok(row.is_some())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row: Option<(i64,)> =
                    query_as("SELECT 1 FROM license_keys WHERE key_hash = $1")
                        .bind(key_hash)
                        .fetch_optional(pool)
                        .await?;
                Ok(row.is_some())
            }
        }
    }

    /// Read-through entry point for status lookups: raw key presented by the caller, hashed
    /// and looked up via the indexed `key_hash` column.
    pub async fn get_license_key_by_hash(&self, key_hash: &str) -> LicenseResult<Option<LicenseKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, LicenseKeyRow>("SELECT * FROM license_keys WHERE key_hash = ?")
                    .bind(key_hash)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(LicenseKey::from))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, LicenseKeyRow>("SELECT * FROM license_keys WHERE key_hash = $1")
                    .bind(key_hash)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(LicenseKey::from))
            }
        }
    }

    pub async fn get_license_key(&self, id: Uuid) -> LicenseResult<Option<LicenseKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, LicenseKeyRow>("SELECT * FROM license_keys WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(LicenseKey::from))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, LicenseKeyRow>("SELECT * FROM license_keys WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                Ok(row.map(LicenseKey::from))
            }
        }
    }

    pub async fn list_license_keys_by_email(
        &self,
        brand_id: Uuid,
        customer_email: &str,
    ) -> LicenseResult<Vec<LicenseKey>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows = query_as::<_, LicenseKeyRow>(
                    "SELECT * FROM license_keys WHERE brand_id = ? AND customer_email = ? ORDER BY created_at DESC",
                )
                .bind(brand_id)
                .bind(customer_email)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(LicenseKey::from).collect())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows = query_as::<_, LicenseKeyRow>(
                    "SELECT * FROM license_keys WHERE brand_id = $1 AND customer_email = $2 ORDER BY created_at DESC",
                )
                .bind(brand_id)
                .bind(customer_email)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(LicenseKey::from).collect())
            }
        }
    }

    // ===================================================================
    // License
    // ===================================================================

    pub async fn create_license(&self, license: &License) -> LicenseResult<()> {
        let status = license.status.to_string();
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO licenses (id, license_key_id, product_id, status, seat_limit, expires_at, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(license.id)
                .bind(license.license_key_id)
                .bind(license.product_id)
                .bind(status)
                .bind(license.seat_limit as i64)
                .bind(license.expires_at)
                .bind(license.created_at)
                .bind(license.updated_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO licenses (id, license_key_id, product_id, status, seat_limit, expires_at, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(license.id)
                .bind(license.license_key_id)
                .bind(license.product_id)
                .bind(status)
                .bind(license.seat_limit as i64)
                .bind(license.expires_at)
                .bind(license.created_at)
                .bind(license.updated_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn get_license(&self, id: Uuid) -> LicenseResult<Option<License>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, LicenseRow>("SELECT * FROM licenses WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(License::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, LicenseRow>("SELECT * FROM licenses WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(License::try_from).transpose()
            }
        }
    }

    pub async fn list_licenses_by_license_key(&self, license_key_id: Uuid) -> LicenseResult<Vec<License>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows = query_as::<_, LicenseRow>(
                    "SELECT * FROM licenses WHERE license_key_id = ? ORDER BY created_at ASC",
                )
                .bind(license_key_id)
                .fetch_all(pool)
                .await?;
                rows.into_iter().map(License::try_from).collect()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows = query_as::<_, LicenseRow>(
                    "SELECT * FROM licenses WHERE license_key_id = $1 ORDER BY created_at ASC",
                )
                .bind(license_key_id)
                .fetch_all(pool)
                .await?;
                rows.into_iter().map(License::try_from).collect()
            }
        }
    }

    /// Persists the full row after a lifecycle transition (renew/suspend/resume/cancel).
    pub async fn update_license(&self, license: &License) -> LicenseResult<()> {
        let status = license.status.to_string();
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "UPDATE licenses SET status = ?, seat_limit = ?, expires_at = ?, updated_at = ? WHERE id = ?",
                )
                .bind(status)
                .bind(license.seat_limit as i64)
                .bind(license.expires_at)
                .bind(license.updated_at)
                .bind(license.id)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "UPDATE licenses SET status = $1, seat_limit = $2, expires_at = $3, updated_at = $4 WHERE id = $5",
                )
                .bind(status)
                .bind(license.seat_limit as i64)
                .bind(license.expires_at)
                .bind(license.updated_at)
                .bind(license.id)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Conditional sweep: `valid` rows whose `expires_at` has passed become `expired` in one
    /// statement, so concurrent scheduler instances never race on read-then-write. Returns the
    /// number of rows transitioned.
    /// Transitions every `valid` license whose `expires_at` has passed to `expired` and returns
    /// the distinct `license_key_id`s affected, so callers can invalidate cached status reads.
    /// The update itself is a single conditional statement, safe to run concurrently from more
    /// than one scheduler tick.
    pub async fn sweep_expired_licenses(&self, now: DateTime<Utc>) -> LicenseResult<Vec<Uuid>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows: Vec<(Uuid,)> = query_as(
                    "UPDATE licenses SET status = 'expired', updated_at = ? \
                     WHERE status = 'valid' AND expires_at IS NOT NULL AND expires_at < ? \
                     RETURNING license_key_id",
                )
                .bind(now)
                .bind(now)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(|(id,)| id).collect())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows: Vec<(Uuid,)> = query_as(
                    "UPDATE licenses SET status = 'expired', updated_at = $1 \
                     WHERE status = 'valid' AND expires_at IS NOT NULL AND expires_at < $2 \
                     RETURNING license_key_id",
                )
                .bind(now)
                .bind(now)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(|(id,)| id).collect())
            }
        }
    }

    // ===================================================================
    // Activation / seat management
    // ===================================================================

    pub async fn get_activation(&self, id: Uuid) -> LicenseResult<Option<Activation>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, ActivationRow>("SELECT * FROM activations WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(Activation::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, ActivationRow>("SELECT * FROM activations WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
                row.map(Activation::try_from).transpose()
            }
        }
    }

    async fn get_activation_by_identifier(
        &self,
        license_id: Uuid,
        instance_identifier: &str,
    ) -> LicenseResult<Option<Activation>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = ? AND instance_identifier = ?",
                )
                .bind(license_id)
                .bind(instance_identifier)
                .fetch_optional(pool)
                .await?;
                row.map(Activation::try_from).transpose()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = $1 AND instance_identifier = $2",
                )
                .bind(license_id)
                .bind(instance_identifier)
                .fetch_optional(pool)
                .await?;
                row.map(Activation::try_from).transpose()
            }
        }
    }

    async fn update_activation(&self, activation: &Activation) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "UPDATE activations SET instance_metadata = ?, activated_at = ?, last_checked_at = ?, deactivated_at = ?, is_active = ? WHERE id = ?",
                )
                .bind(sqlx::types::Json(&activation.instance_metadata))
                .bind(activation.activated_at)
                .bind(activation.last_checked_at)
                .bind(activation.deactivated_at)
                .bind(activation.is_active)
                .bind(activation.id)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "UPDATE activations SET instance_metadata = $1, activated_at = $2, last_checked_at = $3, deactivated_at = $4, is_active = $5 WHERE id = $6",
                )
                .bind(sqlx::types::Json(&activation.instance_metadata))
                .bind(activation.activated_at)
                .bind(activation.last_checked_at)
                .bind(activation.deactivated_at)
                .bind(activation.is_active)
                .bind(activation.id)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn list_activations_by_license(&self, license_id: Uuid) -> LicenseResult<Vec<Activation>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = ? ORDER BY activated_at ASC",
                )
                .bind(license_id)
                .fetch_all(pool)
                .await?;
                rows.into_iter().map(Activation::try_from).collect()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = $1 ORDER BY activated_at ASC",
                )
                .bind(license_id)
                .fetch_all(pool)
                .await?;
                rows.into_iter().map(Activation::try_from).collect()
            }
        }
    }

    /// The seat-bounded critical section: look up (or create) the activation row for
    /// `instance_identifier` under `license_id`, enforcing `seat_limit`.
    ///
    /// - Already active: `Err(DuplicateActive)`.
    /// - Inactive row exists: reactivated in place, returns `(activation, true)`.
    /// - No row and under the seat limit: created, returns `(activation, false)`.
    /// - No row and at the seat limit: `Err(SeatLimitExceeded)`.
    ///
    /// On SQLite this is serialized per-license via an in-process mutex (SQLite has no
    /// `SELECT ... FOR UPDATE`); on Postgres the row lock itself provides the serialization.
    pub async fn activate_seat(
        &self,
        license_id: Uuid,
        seat_limit: u32,
        instance_identifier: &str,
        instance_type: InstanceType,
        instance_metadata: serde_json::Value,
    ) -> LicenseResult<(Activation, bool)> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, locks) => {
                let lock = locks.get(license_id);
                let _guard = lock.lock().await;
                let mut tx = pool.begin().await?;

                let existing = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = ? AND instance_identifier = ?",
                )
                .bind(license_id)
                .bind(instance_identifier)
                .fetch_optional(&mut *tx)
                .await?;

                if let Some(row) = existing {
                    let mut activation = Activation::try_from(row)?;
                    if activation.is_active {
                        return Err(LicenseError::DuplicateActive);
                    }
                    activation.reactivate(instance_metadata);
                    let instance_type_str = activation.instance_type.to_string();
                    query(
                        "UPDATE activations SET instance_metadata = ?, activated_at = ?, last_checked_at = ?, deactivated_at = ?, is_active = ?, instance_type = ? WHERE id = ?",
                    )
                    .bind(sqlx::types::Json(&activation.instance_metadata))
                    .bind(activation.activated_at)
                    .bind(activation.last_checked_at)
                    .bind(activation.deactivated_at)
                    .bind(activation.is_active)
                    .bind(instance_type_str)
                    .bind(activation.id)
                    .execute(&mut *tx)
                    .await?;
                    tx.commit().await?;
                    return Ok((activation, true));
                }

                let (count,): (i64,) = query_as(
                    "SELECT COUNT(*) FROM activations WHERE license_id = ? AND is_active = 1",
                )
                .bind(license_id)
                .fetch_one(&mut *tx)
                .await?;

                if count >= seat_limit as i64 {
                    return Err(LicenseError::SeatLimitExceeded);
                }

                let activation = Activation::create(
                    license_id,
                    instance_identifier.to_string(),
                    instance_type,
                    instance_metadata,
                )?;
                let instance_type_str = activation.instance_type.to_string();
                query(
                    "INSERT INTO activations (id, license_id, instance_identifier, instance_type, instance_metadata, activated_at, last_checked_at, deactivated_at, is_active)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(activation.id)
                .bind(activation.license_id)
                .bind(&activation.instance_identifier)
                .bind(instance_type_str)
                .bind(sqlx::types::Json(&activation.instance_metadata))
                .bind(activation.activated_at)
                .bind(activation.last_checked_at)
                .bind(activation.deactivated_at)
                .bind(activation.is_active)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok((activation, false))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;

                // Lock the license row so concurrent activations against the same license
                // serialize on this transaction rather than racing the seat count below.
                query("SELECT id FROM licenses WHERE id = $1 FOR UPDATE")
                    .bind(license_id)
                    .fetch_one(&mut *tx)
                    .await?;

                let existing = query_as::<_, ActivationRow>(
                    "SELECT * FROM activations WHERE license_id = $1 AND instance_identifier = $2",
                )
                .bind(license_id)
                .bind(instance_identifier)
                .fetch_optional(&mut *tx)
                .await?;

                if let Some(row) = existing {
                    let mut activation = Activation::try_from(row)?;
                    if activation.is_active {
                        return Err(LicenseError::DuplicateActive);
                    }
                    activation.reactivate(instance_metadata);
                    let instance_type_str = activation.instance_type.to_string();
                    query(
                        "UPDATE activations SET instance_metadata = $1, activated_at = $2, last_checked_at = $3, deactivated_at = $4, is_active = $5, instance_type = $6 WHERE id = $7",
                    )
                    .bind(sqlx::types::Json(&activation.instance_metadata))
                    .bind(activation.activated_at)
                    .bind(activation.last_checked_at)
                    .bind(activation.deactivated_at)
                    .bind(activation.is_active)
                    .bind(instance_type_str)
                    .bind(activation.id)
                    .execute(&mut *tx)
                    .await?;
                    tx.commit().await?;
                    return Ok((activation, true));
                }

                let (count,): (i64,) = query_as(
                    "SELECT COUNT(*) FROM activations WHERE license_id = $1 AND is_active = true",
                )
                .bind(license_id)
                .fetch_one(&mut *tx)
                .await?;

                if count >= seat_limit as i64 {
                    return Err(LicenseError::SeatLimitExceeded);
                }

                let activation = Activation::create(
                    license_id,
                    instance_identifier.to_string(),
                    instance_type,
                    instance_metadata,
                )?;
                let instance_type_str = activation.instance_type.to_string();
                query(
                    "INSERT INTO activations (id, license_id, instance_identifier, instance_type, instance_metadata, activated_at, last_checked_at, deactivated_at, is_active)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(activation.id)
                .bind(activation.license_id)
                .bind(&activation.instance_identifier)
                .bind(instance_type_str)
                .bind(sqlx::types::Json(&activation.instance_metadata))
                .bind(activation.activated_at)
                .bind(activation.last_checked_at)
                .bind(activation.deactivated_at)
                .bind(activation.is_active)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok((activation, false))
            }
        }
    }

    /// Idempotent: deactivating an already-inactive or absent instance still succeeds.
    /// Returns `true` if an active row was actually flipped.
    pub async fn deactivate_seat(
        &self,
        license_id: Uuid,
        instance_identifier: &str,
    ) -> LicenseResult<bool> {
        let existing = self.get_activation_by_identifier(license_id, instance_identifier).await?;
        let Some(mut activation) = existing else {
            return Ok(false);
        };
        if !activation.is_active {
            return Ok(false);
        }
        activation.deactivate();
        self.update_activation(&activation).await?;
        Ok(true)
    }

    // ===================================================================
    // WebhookConfig
    // ===================================================================

    pub async fn create_webhook_config(&self, config: &WebhookConfig) -> LicenseResult<()> {
        let events: Vec<String> = config.events.iter().cloned().collect();
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO webhook_configs (id, brand_id, url, secret, events, is_active, max_retries, timeout_seconds, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(config.id)
                .bind(config.brand_id)
                .bind(&config.url)
                .bind(&config.secret)
                .bind(sqlx::types::Json(events))
                .bind(config.is_active)
                .bind(config.max_retries as i64)
                .bind(config.timeout_seconds as i64)
                .bind(config.created_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO webhook_configs (id, brand_id, url, secret, events, is_active, max_retries, timeout_seconds, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(config.id)
                .bind(config.brand_id)
                .bind(&config.url)
                .bind(&config.secret)
                .bind(sqlx::types::Json(events))
                .bind(config.is_active)
                .bind(config.max_retries as i64)
                .bind(config.timeout_seconds as i64)
                .bind(config.created_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// All active webhook subscriptions for a brand; the dispatcher filters by event type.
    pub async fn list_webhook_configs_by_brand(&self, brand_id: Uuid) -> LicenseResult<Vec<WebhookConfig>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows = query_as::<_, WebhookConfigRow>(
                    "SELECT * FROM webhook_configs WHERE brand_id = ?",
                )
                .bind(brand_id)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(WebhookConfig::from).collect())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows = query_as::<_, WebhookConfigRow>(
                    "SELECT * FROM webhook_configs WHERE brand_id = $1",
                )
                .bind(brand_id)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(WebhookConfig::from).collect())
            }
        }
    }

    // ===================================================================
    // AuditLog
    // ===================================================================

    pub async fn insert_audit_log(&self, log: &AuditLog) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO audit_logs (id, brand_id, entity_type, entity_id, action, changes, actor, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(log.id)
                .bind(log.brand_id)
                .bind(&log.entity_type)
                .bind(log.entity_id)
                .bind(&log.action)
                .bind(sqlx::types::Json(&log.changes))
                .bind(&log.actor)
                .bind(log.created_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO audit_logs (id, brand_id, entity_type, entity_id, action, changes, actor, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(log.id)
                .bind(log.brand_id)
                .bind(&log.entity_type)
                .bind(log.entity_id)
                .bind(&log.action)
                .bind(sqlx::types::Json(&log.changes))
                .bind(&log.actor)
                .bind(log.created_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn list_audit_logs_by_entity(&self, entity_id: Uuid) -> LicenseResult<Vec<AuditLog>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let rows = query_as::<_, AuditLogRow>(
                    "SELECT * FROM audit_logs WHERE entity_id = ? ORDER BY created_at DESC",
                )
                .bind(entity_id)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(AuditLog::from).collect())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let rows = query_as::<_, AuditLogRow>(
                    "SELECT * FROM audit_logs WHERE entity_id = $1 ORDER BY created_at DESC",
                )
                .bind(entity_id)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(AuditLog::from).collect())
            }
        }
    }

    // ===================================================================
    // Idempotency
    // ===================================================================

    pub async fn get_idempotency_record(
        &self,
        brand_id: Uuid,
        key: &str,
    ) -> LicenseResult<Option<crate::domain::IdempotencyRecord>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                let row = query_as::<_, IdempotencyRow>(
                    "SELECT * FROM idempotency_keys WHERE brand_id = ? AND key = ?",
                )
                .bind(brand_id)
                .bind(key)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(crate::domain::IdempotencyRecord::from))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query_as::<_, IdempotencyRow>(
                    "SELECT * FROM idempotency_keys WHERE brand_id = $1 AND key = $2",
                )
                .bind(brand_id)
                .bind(key)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(crate::domain::IdempotencyRecord::from))
            }
        }
    }

    /// Inserts the record, or silently no-ops if a concurrent request already wrote one for
    /// the same `(brand_id, key)` — the unique index is what actually enforces exactly-once.
    pub async fn insert_idempotency_record(
        &self,
        record: &crate::domain::IdempotencyRecord,
    ) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool, _) => {
                query(
                    "INSERT INTO idempotency_keys (brand_id, key, status_code, response_body, created_at, expires_at)
                     VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT(brand_id, key) DO NOTHING",
                )
                .bind(record.brand_id)
                .bind(&record.key)
                .bind(record.status_code as i64)
                .bind(sqlx::types::Json(&record.response_body))
                .bind(record.created_at)
                .bind(record.expires_at)
                .execute(pool)
                .await?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    "INSERT INTO idempotency_keys (brand_id, key, status_code, response_body, created_at, expires_at)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (brand_id, key) DO NOTHING",
                )
                .bind(record.brand_id)
                .bind(&record.key)
                .bind(record.status_code as i64)
                .bind(sqlx::types::Json(&record.response_body))
                .bind(record.created_at)
                .bind(record.expires_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }
}

// ===========================================================================
// Row types
// ===========================================================================

#[derive(Debug, Clone, FromRow)]
struct BrandRow {
    id: Uuid,
    name: String,
    slug: String,
    prefix: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BrandRow> for Brand {
    type Error = LicenseError;
    fn try_from(row: BrandRow) -> LicenseResult<Self> {
        Ok(Brand {
            id: row.id,
            name: row.name,
            slug: row.slug,
            prefix: row.prefix,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct ProductRow {
    id: Uuid,
    brand_id: Uuid,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            brand_id: row.brand_id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct ApiKeyRow {
    id: Uuid,
    brand_id: Uuid,
    key_prefix: String,
    key_hash: String,
    scope: String,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApiKeyRow> for ApiKey {
    type Error = LicenseError;
    fn try_from(row: ApiKeyRow) -> LicenseResult<Self> {
        Ok(ApiKey {
            id: row.id,
            brand_id: row.brand_id,
            key_prefix: row.key_prefix,
            key_hash: row.key_hash,
            scope: scope_from_str(&row.scope)?,
            expires_at: row.expires_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct LicenseKeyRow {
    id: Uuid,
    brand_id: Uuid,
    key: String,
    key_hash: String,
    customer_email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LicenseKeyRow> for LicenseKey {
    fn from(row: LicenseKeyRow) -> Self {
        LicenseKey {
            id: row.id,
            brand_id: row.brand_id,
            key: row.key,
            key_hash: row.key_hash,
            customer_email: row.customer_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct LicenseRow {
    id: Uuid,
    license_key_id: Uuid,
    product_id: Uuid,
    status: String,
    seat_limit: i64,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LicenseRow> for License {
    type Error = LicenseError;
    fn try_from(row: LicenseRow) -> LicenseResult<Self> {
        Ok(License {
            id: row.id,
            license_key_id: row.license_key_id,
            product_id: row.product_id,
            status: row.status.parse::<LicenseStatus>()?,
            seat_limit: row.seat_limit as u32,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct ActivationRow {
    id: Uuid,
    license_id: Uuid,
    instance_identifier: String,
    instance_type: String,
    instance_metadata: sqlx::types::Json<serde_json::Value>,
    activated_at: DateTime<Utc>,
    last_checked_at: DateTime<Utc>,
    deactivated_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl TryFrom<ActivationRow> for Activation {
    type Error = LicenseError;
    fn try_from(row: ActivationRow) -> LicenseResult<Self> {
        Ok(Activation {
            id: row.id,
            license_id: row.license_id,
            instance_identifier: row.instance_identifier,
            instance_type: row.instance_type.parse::<InstanceType>()?,
            instance_metadata: row.instance_metadata.0,
            activated_at: row.activated_at,
            last_checked_at: row.last_checked_at,
            deactivated_at: row.deactivated_at,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct WebhookConfigRow {
    id: Uuid,
    brand_id: Uuid,
    url: String,
    secret: String,
    events: sqlx::types::Json<Vec<String>>,
    is_active: bool,
    max_retries: i64,
    timeout_seconds: i64,
    created_at: DateTime<Utc>,
}

impl From<WebhookConfigRow> for WebhookConfig {
    fn from(row: WebhookConfigRow) -> Self {
        WebhookConfig {
            id: row.id,
            brand_id: row.brand_id,
            url: row.url,
            secret: row.secret,
            events: row.events.0.into_iter().collect::<HashSet<String>>(),
            is_active: row.is_active,
            max_retries: row.max_retries as u32,
            timeout_seconds: row.timeout_seconds as u64,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AuditLogRow {
    id: Uuid,
    brand_id: Uuid,
    entity_type: String,
    entity_id: Uuid,
    action: String,
    changes: sqlx::types::Json<serde_json::Value>,
    actor: String,
    created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        AuditLog {
            id: row.id,
            brand_id: row.brand_id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action: row.action,
            changes: row.changes.0,
            actor: row.actor,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct IdempotencyRow {
    brand_id: Uuid,
    key: String,
    status_code: i64,
    response_body: sqlx::types::Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<IdempotencyRow> for crate::domain::IdempotencyRecord {
    fn from(row: IdempotencyRow) -> Self {
        crate::domain::IdempotencyRecord {
            brand_id: row.brand_id,
            key: row.key,
            status_code: row.status_code as u16,
            response_body: row.response_body.0,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
