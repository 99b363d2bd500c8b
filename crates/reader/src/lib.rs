//! # Reader - read-only access to a LevelDB-style table store
//!
//! Ties the [`wal`] log framing, the [`sstable`] table format and the shared
//! [`cache`] together into a dictionary over a database directory.
//!
//! ## Open path
//!
//! ```text
//! dir/CURRENT ──► "MANIFEST-000001"
//!                        │
//!                        v
//! dir/MANIFEST-000001 ──► LogReader ──► version edits ──► VersionSet
//!                                                           │
//!                                           files: [TableFile, ...]
//! ```
//!
//! ## Read path
//!
//! ```text
//! try_get(key)
//!   └─► first file whose [smallest, largest] covers key
//!         └─► open (footer + index) ──► index ceiling ──► data block
//!                                                         (BlockCache)
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                             |
//! |----------------|-----------------------------------------------------|
//! | [`lib.rs`]     | `Table` struct, constructors, accessors, `Debug`    |
//! | [`recovery`]   | `CURRENT` resolution and manifest replay            |
//! | [`manifest`]   | `VersionSet` and version-edit decoding              |
//! | [`read`]       | `try_get()`, `contains_key()`, scans                |
//! | [`error`]      | `Error` and `Result`                                |
//!
//! Every table file stays closed until a query needs it. Point lookups leave
//! the file open; full enumeration closes each file once it is drained
//! (see [`Options::close_after_scan`]).
mod error;
mod manifest;
mod read;
mod recovery;

pub use config::Options;
pub use error::{Error, Result};
pub use manifest::VersionSet;
pub use read::Entries;
pub use recovery::{load_version_set, read_current, CURRENT_FILENAME};

use sstable::{BlockCache, BytewiseComparator, Comparator, Decompressor, SnappyDecompressor};
use sstable::BYTEWISE_COMPARATOR_NAME;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A read-only dictionary over one database directory.
///
/// Owns the recovered [`VersionSet`] and the block cache shared by all of its
/// table files. Queries take `&mut self` because they open table files on
/// demand; the cache itself is internally synchronized and may be shared.
pub struct Table {
    pub(crate) dir: PathBuf,
    pub(crate) versions: VersionSet,
    pub(crate) cache: Arc<BlockCache>,
    pub(crate) decompressor: Arc<dyn Decompressor>,
    pub(crate) comparator: BytewiseComparator,
    pub(crate) options: Options,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("dir", &self.dir)
            .field("comparator", &self.comparator.name())
            .field("file_count", &self.versions.files().len())
            .field("cached_blocks", &self.cache.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Table {
    /// Opens the database in `dir` with default [`Options`].
    ///
    /// # Errors
    ///
    /// See [`Table::open_with`].
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, &Options::default())
    }

    /// Opens the database in `dir`.
    ///
    /// # Steps
    ///
    /// 1. Read the manifest name from `CURRENT`.
    /// 2. Replay the manifest into a [`VersionSet`].
    /// 3. Reject any comparator other than the bytewise one.
    /// 4. Build an empty block cache of `options.block_cache_capacity` blocks.
    ///
    /// No table file is opened here.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if `CURRENT` or the manifest cannot be read.
    /// - [`Error::InvalidCurrent`] if `CURRENT` is blank.
    /// - [`Error::Log`], [`Error::UnknownTag`], [`Error::Coding`],
    ///   [`Error::Table`] for a corrupt manifest.
    /// - [`Error::UnsupportedComparator`] for a non-bytewise comparator.
    pub fn open_with<P: AsRef<Path>>(dir: P, options: &Options) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        let manifest = read_current(&dir)?;
        let versions = load_version_set(&dir, &manifest)?;

        if let Some(name) = versions.comparator() {
            if name != BYTEWISE_COMPARATOR_NAME {
                return Err(Error::UnsupportedComparator(name.to_string()));
            }
        }

        debug!(
            dir = %dir.display(),
            manifest = %manifest,
            files = versions.files().len(),
            comparator = BYTEWISE_COMPARATOR_NAME,
            "opened table"
        );

        Ok(Self {
            dir,
            versions,
            cache: Arc::new(BlockCache::new(options.block_cache_capacity)),
            decompressor: Arc::new(SnappyDecompressor),
            comparator: BytewiseComparator,
            options: options.clone(),
        })
    }

    /// The ordering used for lookups.
    #[must_use]
    pub fn comparator(&self) -> &dyn Comparator {
        &self.comparator
    }

    #[must_use]
    pub fn version_set(&self) -> &VersionSet {
        &self.versions
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.versions.files().len()
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The block cache shared by every table file.
    #[must_use]
    pub fn block_cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    /// Closes every open table file. Later queries reopen them lazily.
    pub fn close_all(&mut self) {
        for file in self.versions.files_mut() {
            file.close();
        }
    }

    /// Drops every cached block.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Replaces the codec used for compressed blocks.
    ///
    /// Open files are closed so that every later block load uses the new
    /// codec. Blocks already in the cache are kept.
    pub fn set_decompressor(&mut self, decompressor: Arc<dyn Decompressor>) {
        self.close_all();
        self.decompressor = decompressor;
    }
}

#[cfg(test)]
mod tests;
