//! Query interception: the read-through cache in front of a driver.
//!
//! Every query and prepared-statement execution passes through an
//! [`Interceptor`]. For each one it:
//!
//! 1. Bypasses the cache entirely when disabled or when the query carries no
//!    cache directives (see [`attributes`](crate::attributes)).
//! 2. Computes the cache key and consults the [`Cacher`].
//! 3. On a hit, returns a [`CachedRows`] without touching the driver.
//! 4. On a miss, runs the live query and wraps its cursor in a [`RowsRecorder`]
//!    that writes the result back once it has been read cleanly to the end.
//!
//! Failures of the caching side-channel (key function, backend reads and
//! writes) never fail the query. They are counted in [`Stats::errors`], logged,
//! and passed to the optional error hook. Driver errors are returned untouched.
//!
//! ## Core types
//!
//! - [`Config`]: validated construction settings.
//! - [`Interceptor`]: the cache itself; cheap to clone.
//! - [`QueryInterceptor`]: the two call shapes a driver adapter invokes.
//! - [`Stats`]: hit/miss/error counters snapshot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::attributes;
use crate::cache::{BackendError, Cacher, Item};
use crate::driver::{CachedConn, DriverError, NamedValue, Queryer, Rows, StmtQueryer};
use crate::key::{self, KeyError, KeyFn};
use crate::rows::{CachedRows, Commit, RowsRecorder};

/// Callback receiving every caching-side failure.
pub type ErrorHook = Arc<dyn Fn(CacheError) + Send + Sync>;

/// Construction errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cache must be set in Config")]
    MissingCache,
}

/// A failure in the caching side-channel, as reported to the error hook.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key function failed: {0}")]
    Key(#[source] KeyError),

    #[error("cache get failed: {0}")]
    Get(#[source] BackendError),

    #[error("cache set failed: {0}")]
    Set(#[source] BackendError),
}

/// Settings for [`Interceptor::new`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sqlcache::{Config, Interceptor, MemoryCache, key};
///
/// let config = Config::default()
///     .cache(Arc::new(MemoryCache::default()))
///     .key_fn(key::noop_key)
///     .on_error(|err| eprintln!("sqlcache: {err}"));
///
/// let interceptor = Interceptor::new(config).unwrap();
/// assert!(interceptor.is_enabled());
/// ```
#[derive(Clone, Default)]
pub struct Config {
    cache: Option<Arc<dyn Cacher>>,
    on_error: Option<ErrorHook>,
    key_fn: Option<KeyFn>,
}

impl Config {
    /// Shorthand for `Config::default().cache(cache)`.
    pub fn new(cache: Arc<dyn Cacher>) -> Self {
        Self::default().cache(cache)
    }

    /// Sets the backend. Required.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn Cacher>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets a hook called with every key, get and set failure.
    ///
    /// The interceptor does not fail queries on these errors; the hook is the
    /// place to log them or to [`disable`](Interceptor::disable) caching.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(CacheError) + Send + Sync + 'static,
    {
        let hook: ErrorHook = Arc::new(hook);
        self.on_error = Some(hook);
        self
    }

    /// Replaces the default [`key::fingerprint`] strategy.
    #[must_use]
    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&str, &[NamedValue]) -> Result<String, KeyError> + Send + Sync + 'static,
    {
        let key_fn: KeyFn = Arc::new(key_fn);
        self.key_fn = Some(key_fn);
        self
    }
}

/// Snapshot of interceptor counters.
///
/// Queries without cache directives, and queries run while disabled, are not
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl Stats {
    /// Fraction of cache lookups that hit (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// The two query call shapes a driver adapter routes through.
///
/// [`CachedConn`] and [`CachedStmt`](crate::CachedStmt) depend only on this
/// trait; [`Interceptor`] is its caching implementation.
#[async_trait]
pub trait QueryInterceptor: Send + Sync {
    /// A query issued directly on a connection.
    async fn conn_query(
        &self,
        conn: &dyn Queryer,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError>;

    /// A query issued through a prepared statement whose text is `query`.
    async fn stmt_query(
        &self,
        stmt: &dyn StmtQueryer,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError>;
}

struct Shared {
    cache: Arc<dyn Cacher>,
    key_fn: KeyFn,
    on_error: Option<ErrorHook>,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    enabled: AtomicBool,
}

impl Shared {
    fn report(&self, err: CacheError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(error = %err, "sqlcache operation failed");
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

/// A read-through query cache.
///
/// Cloning is cheap; clones share the backend, the counters and the
/// enabled flag.
#[derive(Clone)]
pub struct Interceptor {
    shared: Arc<Shared>,
}

impl Interceptor {
    /// Creates an interceptor, enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCache`] if no backend was configured.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let cache = config.cache.ok_or(ConfigError::MissingCache)?;
        let key_fn = config.key_fn.unwrap_or_else(|| {
            let default: KeyFn = Arc::new(key::fingerprint);
            default
        });

        Ok(Self {
            shared: Arc::new(Shared {
                cache,
                key_fn,
                on_error: config.on_error,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                enabled: AtomicBool::new(true),
            }),
        })
    }

    /// Re-enables caching.
    ///
    /// The flag is read without synchronization: queries already in flight,
    /// or racing with this call, may still see the old value.
    pub fn enable(&self) {
        self.shared.enabled.store(true, Ordering::Relaxed);
    }

    /// Disables caching; queries go straight to the driver.
    ///
    /// Same visibility caveat as [`enable`](Self::enable).
    pub fn disable(&self) {
        self.shared.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> Stats {
        Stats {
            hits: self.shared.hits.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            errors: self.shared.errors.load(Ordering::Relaxed),
        }
    }

    /// Wraps a driver connection so its queries go through this interceptor.
    pub fn wrap<C>(&self, conn: C) -> CachedConn<C> {
        CachedConn::new(conn, Arc::new(self.clone()))
    }

    async fn intercept<F, Fut>(
        &self,
        query: &str,
        args: &[NamedValue],
        run: F,
    ) -> Result<Box<dyn Rows>, DriverError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Box<dyn Rows>, DriverError>>,
    {
        if !self.is_enabled() {
            trace!("sqlcache disabled, bypassing");
            return run().await;
        }

        let Some(attrs) = attributes::parse(query) else {
            trace!("no cache directives, bypassing");
            return run().await;
        };

        let key = match (self.shared.key_fn)(query, args) {
            Ok(key) => key,
            Err(err) => {
                self.shared.report(CacheError::Key(err));
                return run().await;
            }
        };

        match self.shared.cache.get(&key).await {
            Ok(Some(item)) => {
                self.shared.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, rows = item.rows.len(), "cache hit");
                return Ok(Box::new(CachedRows::new(item)));
            }
            Ok(None) => {
                self.shared.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache miss");
            }
            Err(err) => self.shared.report(CacheError::Get(err)),
        }

        let rows = run().await?;
        let commit = self.committer(key, attrs.ttl());
        Ok(Box::new(RowsRecorder::new(rows, attrs.max_rows(), commit)))
    }

    fn committer(&self, key: String, ttl: Duration) -> Commit {
        let shared = Arc::clone(&self.shared);
        Box::new(move |item: Item| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(async move {
                let rows = item.rows.len();
                match shared.cache.set(&key, Arc::new(item), ttl).await {
                    Ok(()) => debug!(key = %key, rows = rows, ttl = ?ttl, "result cached"),
                    Err(err) => shared.report(CacheError::Set(err)),
                }
            })
        })
    }
}

#[async_trait]
impl QueryInterceptor for Interceptor {
    async fn conn_query(
        &self,
        conn: &dyn Queryer,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError> {
        self.intercept(query, args, || conn.query(query, args))
            .await
    }

    async fn stmt_query(
        &self,
        stmt: &dyn StmtQueryer,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError> {
        self.intercept(query, args, || stmt.query(args)).await
    }
}
