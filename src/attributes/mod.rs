//! Cache directives embedded in query text.
//!
//! A query opts into caching with two comment directives, in any order and on
//! any line:
//!
//! | Directive                   | Meaning                                          |
//! |-----------------------------|--------------------------------------------------|
//! | `@cache-ttl <seconds>`      | how long the result stays in the cache           |
//! | `@cache-max-rows <count>`   | results with more rows than this are not cached  |
//!
//! Both are required. A query missing either one is never cached.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, checked by the tests below.
    Regex::new(r"(@cache-ttl|@cache-max-rows) (\d+)").unwrap()
});

/// Caching policy parsed from a query.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sqlcache::attributes;
///
/// let attrs = attributes::parse("-- @cache-ttl 30\n-- @cache-max-rows 10\nSELECT 1").unwrap();
/// assert_eq!(attrs.ttl(), Duration::from_secs(30));
/// assert_eq!(attrs.max_rows(), 10);
///
/// assert!(attributes::parse("SELECT 1").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    ttl_secs: u64,
    max_rows: usize,
}

impl Attributes {
    /// Time-to-live for the cached result.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Maximum number of rows a result may have and still be cached.
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }
}

/// Extracts the caching policy from `query`.
///
/// Only the first two directive occurrences are considered, and they must be one
/// of each kind. Values are not validated: a digit run too large for the target
/// integer parses as `0`, and zero values are passed through as-is.
pub fn parse(query: &str) -> Option<Attributes> {
    let mut ttl_secs = None;
    let mut max_rows = None;

    for caps in DIRECTIVE.captures_iter(query).take(2) {
        let value = &caps[2];
        match &caps[1] {
            "@cache-ttl" => ttl_secs = Some(value.parse().unwrap_or(0)),
            _ => max_rows = Some(value.parse().unwrap_or(0)),
        }
    }

    Some(Attributes {
        ttl_secs: ttl_secs?,
        max_rows: max_rows?,
    })
}
