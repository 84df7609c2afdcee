//! Cache key strategies.
//!
//! A key function maps a query's text and bound parameters to the string the
//! result is cached under. Identical text with identical parameters must always
//! produce the same key.
//!
//! - [`fingerprint`]: the default: a SHA-256 digest of the structurally encoded
//!   `(query, args)` pair behind a readable `q<len>a<count>h<digest>` prefix.
//! - [`noop_key`]: no hashing at all; the whitespace-stripped query followed by
//!   the parameter list. Handy for eyeballing what ends up in the cache.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::driver::{BoxError, NamedValue};

/// A pluggable key strategy.
pub type KeyFn = Arc<dyn Fn(&str, &[NamedValue]) -> Result<String, KeyError> + Send + Sync>;

/// Errors produced while computing a cache key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to encode query arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(BoxError),
}

/// Default key function.
///
/// # Examples
///
/// ```
/// use sqlcache::{NamedValue, key};
///
/// let args = [NamedValue::positional(1, 10)];
/// let a = key::fingerprint("SELECT 1 WHERE x > ?", &args).unwrap();
/// let b = key::fingerprint("SELECT 1 WHERE x > ?", &args).unwrap();
/// assert_eq!(a, b);
/// assert!(a.starts_with("q20a1h"));
/// ```
pub fn fingerprint(query: &str, args: &[NamedValue]) -> Result<String, KeyError> {
    #[derive(Serialize)]
    struct Fingerprint<'a> {
        query: &'a str,
        args: &'a [NamedValue],
    }

    let encoded = serde_json::to_vec(&Fingerprint { query, args })?;
    let digest = Sha256::digest(&encoded);

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);

    Ok(format!(
        "q{}a{}h{}",
        query.len(),
        args.len(),
        u64::from_be_bytes(head)
    ))
}

/// Diagnostic key function: the query without whitespace, a `:` and the
/// parameter list.
pub fn noop_key(query: &str, args: &[NamedValue]) -> Result<String, KeyError> {
    let mut key = String::with_capacity(query.len() + args.len() * 10);
    key.extend(query.chars().filter(|ch| !ch.is_whitespace()));
    key.push(':');
    key.push_str(&format!("{args:?}"));
    Ok(key)
}
