use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::Item;
use crate::driver::{DriverError, Rows, Value};

/// Replays a cached [`Item`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sqlcache::{Rows, Value, cache::Item, rows::CachedRows};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let item = Item::new(vec!["name".into()], vec![vec![Value::from("Alice")]]);
/// let mut rows = CachedRows::new(Arc::new(item));
/// let mut dest = vec![Value::Null];
///
/// assert!(rows.next(&mut dest).await.unwrap());
/// assert_eq!(dest[0], Value::from("Alice"));
/// assert!(!rows.next(&mut dest).await.unwrap());
/// # }
/// ```
#[derive(Debug)]
pub struct CachedRows {
    item: Arc<Item>,
    pos: usize,
}

impl CachedRows {
    pub fn new(item: Arc<Item>) -> Self {
        Self { item, pos: 0 }
    }
}

#[async_trait]
impl Rows for CachedRows {
    fn columns(&self) -> &[String] {
        &self.item.columns
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError> {
        let Some(row) = self.item.rows.get(self.pos) else {
            return Ok(false);
        };

        for (slot, value) in dest.iter_mut().zip(row) {
            slot.clone_from(value);
        }
        self.pos += 1;

        Ok(true)
    }

    // Nothing to release.
    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
