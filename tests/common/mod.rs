//! Test doubles shared by the integration tests: a scripted driver and a
//! recording cache backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlcache::{
    BackendError, Cacher, DriverError, Item, NamedValue, Prepare, Queryer, Rows, StmtQueryer,
    Value,
};

pub const CACHED_QUERY: &str = "-- @cache-max-rows 10
              -- @cache-ttl 30
              SELECT name FROM users WHERE age > ?";

pub fn args() -> Vec<NamedValue> {
    NamedValue::from_values([Value::from(18)])
}

pub fn text_rows(names: &[&str]) -> Vec<Vec<Value>> {
    names.iter().map(|n| vec![Value::from(*n)]).collect()
}

pub fn users_item() -> Arc<Item> {
    Arc::new(Item::new(
        vec!["name".to_owned()],
        text_rows(&["John", "Lisa"]),
    ))
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// An in-memory "database" returning the same result for every query.
pub struct MockDb {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    fail_queries: AtomicBool,
    fail_reads_after: Mutex<Option<usize>>,
    live_queries: AtomicUsize,
    last_query: Mutex<Option<String>>,
}

impl MockDb {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Arc<Self> {
        Arc::new(Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows,
            fail_queries: AtomicBool::new(false),
            fail_reads_after: Mutex::new(None),
            live_queries: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    /// `SELECT name FROM users` returning John and Lisa.
    pub fn users() -> Arc<Self> {
        Self::new(&["name"], text_rows(&["John", "Lisa"]))
    }

    pub fn conn(self: &Arc<Self>) -> MockConn {
        MockConn(Arc::clone(self))
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads_after(&self, rows: usize) {
        *self.fail_reads_after.lock().unwrap() = Some(rows);
    }

    /// Number of queries that actually reached the database.
    pub fn live_queries(&self) -> usize {
        self.live_queries.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    fn execute(&self, query: &str) -> Result<Box<dyn Rows>, DriverError> {
        self.live_queries.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_owned());

        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DriverError::new("relation \"users\" does not exist"));
        }

        Ok(Box::new(MockRows {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            pos: 0,
            fail_after: *self.fail_reads_after.lock().unwrap(),
        }))
    }
}

pub struct MockConn(Arc<MockDb>);

#[async_trait]
impl Queryer for MockConn {
    async fn query(&self, query: &str, _args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.0.execute(query)
    }
}

#[async_trait]
impl Prepare for MockConn {
    type Stmt = MockStmt;

    async fn prepare(&self, query: &str) -> Result<MockStmt, DriverError> {
        Ok(MockStmt {
            db: Arc::clone(&self.0),
            query: query.to_owned(),
        })
    }
}

pub struct MockStmt {
    db: Arc<MockDb>,
    query: String,
}

#[async_trait]
impl StmtQueryer for MockStmt {
    async fn query(&self, _args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError> {
        self.db.execute(&self.query)
    }
}

pub struct MockRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    pos: usize,
    fail_after: Option<usize>,
}

#[async_trait]
impl Rows for MockRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError> {
        if self.fail_after == Some(self.pos) {
            return Err(DriverError::new("connection reset by peer"));
        }
        let Some(row) = self.rows.get(self.pos) else {
            return Ok(false);
        };
        for (slot, value) in dest.iter_mut().zip(row) {
            *slot = value.clone();
        }
        self.pos += 1;
        Ok(true)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Reads every row, closes the cursor, and returns the first column as text.
pub async fn collect_names(mut rows: Box<dyn Rows>) -> Result<Vec<String>, DriverError> {
    let mut dest = vec![Value::Null; rows.columns().len()];
    let mut names = Vec::new();
    while rows.next(&mut dest).await? {
        match &dest[0] {
            Value::Text(name) => names.push(name.clone()),
            other => panic!("expected text, got {other:?}"),
        }
    }
    rows.close().await?;
    Ok(names)
}

/// Reads every row and closes the cursor.
pub async fn collect_rows(mut rows: Box<dyn Rows>) -> (Vec<String>, Vec<Vec<Value>>) {
    let columns = rows.columns().to_vec();
    let mut dest = vec![Value::Null; columns.len()];
    let mut out = Vec::new();
    while rows.next(&mut dest).await.unwrap() {
        out.push(dest.clone());
    }
    rows.close().await.unwrap();
    (columns, out)
}

// ── Cache backend ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Lookup {
    Miss,
    Hit(Arc<Item>),
    Fail,
}

pub struct SetCall {
    pub key: String,
    pub item: Arc<Item>,
    pub ttl: Duration,
}

/// A backend with a scripted `get` result that records every `set`.
pub struct MockCacher {
    lookup: Lookup,
    fail_set: bool,
    gets: AtomicUsize,
    sets: Mutex<Vec<SetCall>>,
}

impl MockCacher {
    pub fn new(lookup: Lookup) -> Self {
        Self {
            lookup,
            fail_set: false,
            gets: AtomicUsize::new(0),
            sets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_set(mut self) -> Self {
        self.fail_set = true;
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.lock().unwrap().len()
    }

    pub fn take_sets(&self) -> Vec<SetCall> {
        std::mem::take(&mut *self.sets.lock().unwrap())
    }
}

#[async_trait]
impl Cacher for MockCacher {
    async fn get(&self, _key: &str) -> Result<Option<Arc<Item>>, BackendError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        match &self.lookup {
            Lookup::Miss => Ok(None),
            Lookup::Hit(item) => Ok(Some(Arc::clone(item))),
            Lookup::Fail => Err(BackendError::unavailable("connection refused")),
        }
    }

    async fn set(&self, key: &str, item: Arc<Item>, ttl: Duration) -> Result<(), BackendError> {
        self.sets.lock().unwrap().push(SetCall {
            key: key.to_owned(),
            item,
            ttl,
        });
        if self.fail_set {
            return Err(BackendError::unavailable("out of memory"));
        }
        Ok(())
    }
}

/// Counts error-hook invocations.
#[derive(Clone, Default)]
pub struct HookCounter(Arc<AtomicUsize>);

impl HookCounter {
    pub fn hook(&self) -> impl Fn(sqlcache::CacheError) + Send + Sync + 'static {
        let counter = Arc::clone(&self.0);
        move |_err: sqlcache::CacheError| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
