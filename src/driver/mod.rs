//! Database driver contract: values, result cursors, and the two query call shapes.
//!
//! The cache sits between calling code and a real driver. It only needs a narrow
//! view of that driver:
//!
//! - [`Queryer`]: a query issued directly against a live connection.
//! - [`StmtQueryer`]: a query issued through a previously prepared statement.
//! - [`Rows`]: the result cursor both call shapes return.
//!
//! [`CachedConn`] and [`CachedStmt`] adapt any driver that implements these traits
//! so every query is routed through an [`Interceptor`](crate::Interceptor).

use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod conn;

pub use conn::{CachedConn, CachedStmt};

/// Boxed error type used at the driver and backend boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by the underlying database driver.
///
/// The cache never inspects or rewraps these: a failing live query or a failing
/// cursor read reaches the caller exactly as the driver produced it.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DriverError(#[from] BoxError);

impl DriverError {
    /// Wraps any error (or message) produced by a driver.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    /// Returns the driver's original error.
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// A single column value, as produced by a driver or replayed from the cache.
///
/// # Examples
///
/// ```
/// use sqlcache::Value;
///
/// let v = Value::from("Alice");
/// assert_eq!(v, Value::Text("Alice".to_owned()));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Serialized by bit pattern, so NaN and the infinities survive encoding
    /// and stay distinct from each other.
    Float(#[serde(with = "float_bits")] f64),
    Text(String),
    Bytes(Bytes),
    Timestamp(SystemTime),
}

mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

impl Value {
    /// Returns `true` for SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(t) => write!(f, "{t:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Self::Timestamp(v)
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    /// Parameter name for named placeholders, `None` for positional ones.
    pub name: Option<String>,
    /// 1-based position of the parameter.
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    /// Creates a positional parameter.
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    /// Builds positional parameters `1..=n` from a list of values.
    ///
    /// ```
    /// use sqlcache::{NamedValue, Value};
    ///
    /// let args = NamedValue::from_values([Value::from(10), Value::from("x")]);
    /// assert_eq!(args[1].ordinal, 2);
    /// ```
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Vec<Self> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Self::positional(i + 1, value))
            .collect()
    }
}

/// A forward-only result cursor.
///
/// Both live driver cursors and cached replays implement this trait, so calling
/// code cannot tell them apart.
#[async_trait]
pub trait Rows: Send {
    /// Column names, in result order.
    fn columns(&self) -> &[String];

    /// Advances to the next row and writes its values into `dest`.
    ///
    /// Returns `Ok(true)` when a row was written, `Ok(false)` at end-of-data.
    /// `dest` is owned by the caller and may be reused between calls.
    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError>;

    /// Releases the cursor.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// A connection that can run a query directly.
#[async_trait]
pub trait Queryer: Send + Sync {
    async fn query(&self, query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError>;
}

/// A prepared statement that can be queried with bound parameters.
#[async_trait]
pub trait StmtQueryer: Send + Sync {
    async fn query(&self, args: &[NamedValue]) -> Result<Box<dyn Rows>, DriverError>;
}

/// A connection that can prepare statements.
#[async_trait]
pub trait Prepare: Send + Sync {
    type Stmt: StmtQueryer;

    async fn prepare(&self, query: &str) -> Result<Self::Stmt, DriverError>;
}
