//! In-memory backend built on [`moka`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;
use serde::Deserialize;

use super::{BackendError, Cacher, Item};

/// Default total cost, in rows, held by a [`MemoryCache`].
pub const DEFAULT_MAX_COST: u64 = 10_000;

/// Settings for [`MemoryCache`].
///
/// Deserializable so a host process can keep it in its own config file:
///
/// ```
/// use sqlcache::MemoryCacheConfig;
///
/// let cfg: MemoryCacheConfig = serde_json::from_str(r#"{ "max_cost": 500 }"#).unwrap();
/// assert_eq!(cfg.max_cost, 500);
///
/// let cfg: MemoryCacheConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(cfg.max_cost, sqlcache::cache::memory::DEFAULT_MAX_COST);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Upper bound on the summed row count of all cached items.
    pub max_cost: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MAX_COST,
        }
    }
}

#[derive(Clone)]
struct Entry {
    item: Arc<Item>,
    ttl: Duration,
}

// Every entry expires after its own TTL, restarted when the key is overwritten.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// A concurrent in-process cache.
///
/// Each item costs its row count; once the total exceeds
/// [`MemoryCacheConfig::max_cost`] the least valuable entries are evicted.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_cost` rows in total.
    pub fn new(max_cost: u64) -> Self {
        Self::from_config(&MemoryCacheConfig { max_cost })
    }

    pub fn from_config(config: &MemoryCacheConfig) -> Self {
        let inner: Cache<String, Entry> = Cache::builder()
            .max_capacity(config.max_cost)
            .weigher(|_key: &String, entry: &Entry| -> u32 {
                u32::try_from(entry.item.rows.len()).unwrap_or(u32::MAX)
            })
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// Number of live entries. Approximate until pending maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::from_config(&MemoryCacheConfig::default())
    }
}

#[async_trait]
impl Cacher for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<Item>>, BackendError> {
        Ok(self.inner.get(key).map(|entry| entry.item))
    }

    async fn set(&self, key: &str, item: Arc<Item>, ttl: Duration) -> Result<(), BackendError> {
        self.inner.insert(key.to_owned(), Entry { item, ttl });
        Ok(())
    }
}
