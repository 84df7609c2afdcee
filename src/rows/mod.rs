//! Result cursors that sit in front of (or replace) a live driver cursor.
//!
//! - [`RowsRecorder`] forwards a live cursor untouched while buffering its rows,
//!   and hands the buffered [`Item`](crate::cache::Item) to a commit callback when
//!   the cursor is closed after a clean, complete, size-bounded read.
//! - [`CachedRows`] replays a cached item through the same [`Rows`](crate::Rows)
//!   contract, so callers cannot tell a cache hit from a live query.

mod cached;
mod recorder;

pub use cached::CachedRows;
pub use recorder::{Commit, RowsRecorder};
