//! # sqlcache
//!
//! A declarative read-through cache for async database drivers.
//!
//! Queries opt in with two comment directives. The first execution runs against
//! the database and its result is stored in a pluggable backend; identical
//! executions within the TTL are replayed from the cache through the same
//! cursor interface.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlcache::{Config, Interceptor, MemoryCache, Queryer, Value, NamedValue};
//!
//! let interceptor = Interceptor::new(Config::new(Arc::new(MemoryCache::new(10_000))))?;
//! let conn = interceptor.wrap(driver_connection);
//!
//! let mut rows = conn
//!     .query(
//!         "-- @cache-ttl 30
//!          -- @cache-max-rows 10
//!          SELECT name, pages FROM books WHERE pages > $1",
//!         &NamedValue::from_values([Value::from(100)]),
//!     )
//!     .await?;
//! ```
//!
//! Queries without both directives are passed through untouched.

// ── Core ──────────────────────────────────────────────────────────────────────
pub mod attributes;
pub mod interceptor;
pub mod key;
pub mod rows;

// ── Collaborators: driver contract and cache backends ────────────────────────
pub mod cache;
pub mod driver;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{BackendError, Cacher, Item, MemoryCache, MemoryCacheConfig};
#[cfg(feature = "redis")]
pub use cache::RedisCache;
pub use driver::{
    BoxError, CachedConn, CachedStmt, DriverError, NamedValue, Prepare, Queryer, Rows,
    StmtQueryer, Value,
};
pub use interceptor::{CacheError, Config, ConfigError, Interceptor, QueryInterceptor, Stats};
pub use key::KeyError;
