//! Key orderings and range predicates.

use std::cmp::Ordering;

/// Name recorded in the MANIFEST for plain lexicographic byte order.
pub const BYTEWISE_COMPARATOR_NAME: &str = "leveldb.BytewiseComparator";

/// A total order over user keys.
pub trait Comparator: Send + Sync {
    /// The name the store records for this ordering.
    fn name(&self) -> &str;

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Lexicographic byte order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BytewiseComparator;

impl Comparator for BytewiseComparator {
    fn name(&self) -> &str {
        BYTEWISE_COMPARATOR_NAME
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// A contiguous range of user keys, described by where a key falls
/// relative to it.
///
/// `compare` returns `Greater` for keys sorting before the range, `Equal`
/// for keys inside it and `Less` for keys after it. The result must be
/// monotone (non-increasing) in key order.
pub trait KeyFilter {
    fn compare(&self, key: &[u8]) -> Ordering;
}

impl<F> KeyFilter for F
where
    F: Fn(&[u8]) -> Ordering,
{
    fn compare(&self, key: &[u8]) -> Ordering {
        self(key)
    }
}

/// Selects every key starting with a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartsWith {
    prefix: Vec<u8>,
}

impl StartsWith {
    #[must_use]
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

impl KeyFilter for StartsWith {
    fn compare(&self, key: &[u8]) -> Ordering {
        let n = key.len().min(self.prefix.len());
        self.prefix.as_slice().cmp(&key[..n])
    }
}
