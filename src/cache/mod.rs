//! Cache backends: where materialized query results live between executions.
//!
//! The interceptor only depends on the [`Cacher`] trait. Two implementations ship
//! with the crate:
//!
//! - [`MemoryCache`]: in-process, bounded by total row count, per-entry TTL.
//! - `RedisCache`: networked, items serialized as JSON (`redis` feature).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::{BoxError, Value};

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::{MemoryCache, MemoryCacheConfig};
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

/// A complete, materialized query result.
///
/// Once handed to a [`Cacher`] an item is shared behind an [`Arc`] and never
/// mutated again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Item {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// Errors reported by a cache backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(#[source] BoxError),

    #[error("failed to encode or decode cached item: {0}")]
    Codec(#[from] serde_json::Error),
}

impl BackendError {
    /// Wraps a transport or storage failure.
    pub fn unavailable(err: impl Into<BoxError>) -> Self {
        Self::Unavailable(err.into())
    }
}

/// A backend cache store.
///
/// Implementations must be safe to call concurrently from many queries. A
/// missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait Cacher: Send + Sync {
    /// Looks up the item stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Arc<Item>>, BackendError>;

    /// Stores `item` under `key` for `ttl`.
    async fn set(&self, key: &str, item: Arc<Item>, ttl: Duration) -> Result<(), BackendError>;
}
