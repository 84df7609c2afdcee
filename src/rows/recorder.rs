use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::Item;
use crate::driver::{DriverError, Rows, Value};

/// Callback that receives a fully buffered result.
///
/// Invoked at most once, from [`RowsRecorder::close`].
pub type Commit = Box<dyn FnOnce(Item) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Forwards a live cursor while copying its rows into an [`Item`].
///
/// The buffered item is committed on [`close`](Rows::close) only when the
/// cursor reached end-of-data, no read error occurred, and the row count never
/// went past `max_rows`. Anything else is dropped silently.
pub struct RowsRecorder {
    rows: Box<dyn Rows>,
    item: Item,
    commit: Option<Commit>,
    max_rows: usize,
    got_eof: bool,
    got_err: bool,
    max_rows_hit: bool,
}

impl RowsRecorder {
    pub fn new(rows: Box<dyn Rows>, max_rows: usize, commit: Commit) -> Self {
        let item = Item::new(rows.columns().to_vec(), Vec::new());
        Self {
            rows,
            item,
            commit: Some(commit),
            max_rows,
            got_eof: false,
            got_err: false,
            max_rows_hit: false,
        }
    }

    fn skip_reason(&self) -> Option<&'static str> {
        if self.got_err {
            Some("read error")
        } else if self.max_rows_hit {
            Some("max rows exceeded")
        } else if !self.got_eof {
            Some("result not fully consumed")
        } else {
            None
        }
    }
}

#[async_trait]
impl Rows for RowsRecorder {
    fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError> {
        let result = self.rows.next(dest).await;
        match &result {
            Ok(true) => {}
            Ok(false) => self.got_eof = true,
            Err(_) => self.got_err = true,
        }

        if self.got_eof || self.got_err || self.max_rows_hit {
            return result;
        }

        if self.item.rows.len() >= self.max_rows {
            self.max_rows_hit = true;
            return result;
        }

        // The driver may reuse `dest` for the next row.
        self.item.rows.push(dest.to_vec());

        result
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Err(err) = self.rows.close().await {
            self.got_err = true;
            self.commit = None;
            debug!(error = %err, "cursor close failed, result not cached");
            return Err(err);
        }

        let Some(commit) = self.commit.take() else {
            return Ok(());
        };

        match self.skip_reason() {
            None => commit(std::mem::take(&mut self.item)).await,
            Some(reason) => debug!(
                reason = reason,
                rows = self.item.rows.len(),
                "result not cached"
            ),
        }

        Ok(())
    }
}
