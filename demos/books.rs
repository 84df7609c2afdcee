//! Caches a `books` lookup in memory and prints the counters.
//!
//! Run with `RUST_LOG=sqlcache=debug cargo run --example books` to see the
//! hit/miss decisions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlcache::{
    Config, DriverError, Interceptor, MemoryCache, NamedValue, Prepare, Queryer, Rows,
    StmtQueryer, Value,
};
use tracing_subscriber::EnvFilter;

const BOOKS: &[(&str, i64)] = &[("Alice", 120), ("Bob", 340), ("Carol", 8)];

/// A stand-in driver over a fixed table.
#[derive(Clone, Default)]
struct Library {
    round_trips: Arc<AtomicUsize>,
}

impl Library {
    fn select(&self, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);

        let min_pages = match args.first().map(|a| &a.value) {
            Some(Value::Int(n)) => *n,
            other => return Err(DriverError::new(format!("bad pages argument: {other:?}"))),
        };

        let rows = BOOKS
            .iter()
            .filter(|(_, pages)| *pages > min_pages)
            .map(|(name, pages)| vec![Value::from(*name), Value::from(*pages)])
            .collect();

        Ok(Box::new(TableRows {
            columns: vec!["name".to_owned(), "pages".to_owned()],
            rows,
            pos: 0,
        }))
    }
}

#[async_trait]
impl Queryer for Library {
    async fn query(&self, _query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.select(args)
    }
}

struct LibraryStmt(Library);

#[async_trait]
impl StmtQueryer for LibraryStmt {
    async fn query(&self, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.0.select(args)
    }
}

#[async_trait]
impl Prepare for Library {
    type Stmt = LibraryStmt;

    async fn prepare(&self, _query: &str) -> Result<LibraryStmt, DriverError> {
        Ok(LibraryStmt(self.clone()))
    }
}

struct TableRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    pos: usize,
}

#[async_trait]
impl Rows for TableRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError> {
        let Some(row) = self.rows.get(self.pos) else {
            return Ok(false);
        };
        dest.clone_from_slice(row);
        self.pos += 1;
        Ok(true)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

async fn print_rows(mut rows: Box<dyn Rows>) -> Result<(), DriverError> {
    let mut dest = vec![Value::Null; rows.columns().len()];
    while rows.next(&mut dest).await? {
        println!("  {} ({} pages)", dest[0], dest[1]);
    }
    rows.close().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let library = Library::default();
    let interceptor = Interceptor::new(
        Config::new(Arc::new(MemoryCache::default()))
            .on_error(|err| eprintln!("sqlcache: {err}")),
    )?;
    let conn = interceptor.wrap(library.clone());

    let query = "-- @cache-ttl 5
                 -- @cache-max-rows 10
                 SELECT name, pages FROM books WHERE pages > $1";
    let args = NamedValue::from_values([Value::from(10)]);

    for run in 1..=2 {
        println!("direct query, run {run}:");
        print_rows(conn.query(query, &args).await?).await?;
    }

    let stmt = conn.prepare(query).await?;
    println!("prepared statement:");
    print_rows(stmt.query(&args).await?).await?;

    let oversized = "-- @cache-ttl 5
                     -- @cache-max-rows 1
                     SELECT name, pages FROM books WHERE pages > $1";
    println!("max-rows 1 (never cached):");
    print_rows(conn.query(oversized, &args).await?).await?;

    let stats = interceptor.stats();
    println!(
        "round trips: {}, hits: {}, misses: {}, errors: {}, hit rate: {:.2}",
        library.round_trips.load(Ordering::Relaxed),
        stats.hits,
        stats.misses,
        stats.errors,
        stats.hit_rate(),
    );
    println!("{}", serde_json::to_string(&stats)?);

    Ok(())
}
