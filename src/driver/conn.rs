//! Driver adapter: routes a real connection's queries through an interceptor.

use std::sync::Arc;

use async_trait::async_trait;

use super::{DriverError, NamedValue, Prepare, Queryer, Rows, StmtQueryer};
use crate::interceptor::QueryInterceptor;

/// A connection whose queries pass through a [`QueryInterceptor`].
///
/// Created with [`Interceptor::wrap`](crate::Interceptor::wrap) or [`CachedConn::new`].
///
/// # Examples
///
/// ```rust,ignore
/// let interceptor = Interceptor::new(Config::default().cache(Arc::new(MemoryCache::default())))?;
/// let conn = interceptor.wrap(pg_conn);
/// let mut rows = conn.query("-- @cache-ttl 30\n-- @cache-max-rows 10\nSELECT 1", &[]).await?;
/// ```
pub struct CachedConn<C> {
    conn: C,
    interceptor: Arc<dyn QueryInterceptor>,
}

impl<C> CachedConn<C> {
    pub fn new(conn: C, interceptor: Arc<dyn QueryInterceptor>) -> Self {
        Self { conn, interceptor }
    }

    /// Returns the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    /// Unwraps the adapter, returning the original connection.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

#[async_trait]
impl<C> Queryer for CachedConn<C>
where
    C: Queryer,
{
    async fn query(&self, query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.interceptor.conn_query(&self.conn, query, args).await
    }
}

#[async_trait]
impl<C> Prepare for CachedConn<C>
where
    C: Prepare,
{
    type Stmt = CachedStmt<C::Stmt>;

    async fn prepare(&self, query: &str) -> Result<Self::Stmt, DriverError> {
        let stmt = self.conn.prepare(query).await?;
        Ok(CachedStmt {
            stmt,
            query: query.to_owned(),
            interceptor: Arc::clone(&self.interceptor),
        })
    }
}

/// A prepared statement whose executions pass through a [`QueryInterceptor`].
///
/// The statement keeps its query text so cache directives can be read on
/// every execution.
pub struct CachedStmt<S> {
    stmt: S,
    query: String,
    interceptor: Arc<dyn QueryInterceptor>,
}

impl<S> CachedStmt<S> {
    /// The text this statement was prepared from.
    pub fn query_text(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl<S> StmtQueryer for CachedStmt<S>
where
    S: StmtQueryer,
{
    async fn query(&self, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.interceptor
            .stmt_query(&self.stmt, &self.query, args)
            .await
    }
}
