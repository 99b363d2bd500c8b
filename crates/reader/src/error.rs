use coding::CodingError;
use sstable::TableError;
use std::io;
use thiserror::Error;
use wal::LogError;

/// Errors returned by [`Table`](crate::Table).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Coding(#[from] CodingError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Log(#[from] LogError),

    /// `CURRENT` is empty or does not name a manifest.
    #[error("CURRENT does not name a manifest")]
    InvalidCurrent,

    /// A manifest record used a tag outside the version-edit set.
    #[error("unknown record type {0}")]
    UnknownTag(u32),

    #[error("unsupported comparator {0:?}")]
    UnsupportedComparator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
