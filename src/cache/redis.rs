//! Redis backend. Items are stored as JSON with a server-side expiry.

use std::sync::Arc;
use std::time::Duration;

use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use async_trait::async_trait;

use super::{BackendError, Cacher, Item};

/// A cache stored in Redis.
///
/// Every key written by this backend starts with `key_prefix`, so several
/// applications can share one Redis instance.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a managed connection to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, BackendError> {
        let client = ::redis::Client::open(url).map_err(BackendError::unavailable)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(BackendError::unavailable)?;
        Ok(Self::new(conn, key_prefix))
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn encode(item: &Item) -> Result<Vec<u8>, BackendError> {
    Ok(serde_json::to_vec(item)?)
}

fn decode(payload: &[u8]) -> Result<Item, BackendError> {
    Ok(serde_json::from_slice(payload)?)
}

#[async_trait]
impl Cacher for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<Item>>, BackendError> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = conn
            .get(self.prefixed(key))
            .await
            .map_err(BackendError::unavailable)?;

        payload
            .map(|bytes| decode(&bytes).map(Arc::new))
            .transpose()
    }

    /// Redis rejects a zero expiry; such writes surface as
    /// [`BackendError::Unavailable`].
    async fn set(&self, key: &str, item: Arc<Item>, ttl: Duration) -> Result<(), BackendError> {
        let payload = encode(&item)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.prefixed(key), payload, ttl.as_secs())
            .await
            .map_err(BackendError::unavailable)?;
        Ok(())
    }
}
