//! # Config - reader tunables
//!
//! Settings that shape how a database directory is read. None of them change
//! what a lookup returns; they only trade memory for I/O.
//!
//! ## Environment
//!
//! ```text
//! LDB_BLOCK_CACHE       decoded blocks kept in the shared cache  (default: 16)
//! LDB_CLOSE_AFTER_SCAN  close each table file after enumerating it (default: "true")
//! ```

/// Default number of decoded blocks held by the shared block cache.
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 16;

/// Reader options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Capacity of the block cache shared by every table file. Clamped to at
    /// least one entry when the cache is built.
    pub block_cache_capacity: usize,
    /// Whether a full enumeration closes each table file once its entries
    /// have been yielded. Keeps the number of open handles at one during a
    /// scan; point lookups reopen files lazily either way.
    pub close_after_scan: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
            close_after_scan: true,
        }
    }
}

impl Options {
    /// Builds options from the environment, falling back to the defaults for
    /// unset or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            block_cache_capacity: env_or("LDB_BLOCK_CACHE", defaults.block_cache_capacity),
            close_after_scan: env_or("LDB_CLOSE_AFTER_SCAN", defaults.close_after_scan),
        }
    }

    /// Sets the block cache capacity.
    #[must_use]
    pub fn with_block_cache_capacity(mut self, capacity: usize) -> Self {
        self.block_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_close_after_scan(mut self, close: bool) -> Self {
        self.close_after_scan = close;
        self
    }
}

/// Reads and parses `key` from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
