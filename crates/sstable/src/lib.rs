//! # SSTable - Sorted String Table reader
//!
//! Decodes the immutable table files of a LevelDB-style store. Tables are
//! opened lazily, their index block is kept in memory while open, and data
//! blocks are decoded on demand and shared through a bounded LRU cache.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA BLOCKS                                                   │
//! │   block contents | compression (u8) | checksum (u32)          │
//! │   ... repeated ...                                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ META-INDEX BLOCK (unused by this reader)                      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ INDEX BLOCK                                                   │
//! │   separator key -> BlockHandle of the data block ≤ separator  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 48 bytes)                                 │
//! │   meta-index handle | index handle | zero padding to 40 bytes │
//! │   magic lo (u32 LE) | magic hi (u32 LE)                       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Block layout
//!
//! ```text
//! entry*  | restart offset (u32 LE)* | restart count (u32 LE)
//!
//! entry = shared (varint32) | non_shared (varint32) | value_len (varint32)
//!         | key suffix (non_shared bytes) | value (value_len bytes)
//! ```
//!
//! Keys are internal keys: the user key followed by an 8-byte trailer packing
//! a 56-bit sequence number and a one-byte value type. Deletion entries are
//! decoded but never surface in query results. Index separators keep their
//! entries whatever the type, since a separator may be a deleted key.
//!
//! Checksums on blocks are carried but not verified.

mod block;
mod comparator;
mod compress;
mod format;
mod key;
mod reader;

#[cfg(any(test, feature = "test-util"))]
mod writer;

pub use block::Block;
pub use comparator::{
    BytewiseComparator, Comparator, KeyFilter, StartsWith, BYTEWISE_COMPARATOR_NAME,
};
pub use compress::{Decompressor, SnappyDecompressor};
pub use format::{
    read_block, read_block_contents, read_footer, read_index_block, table_file_name, BlockHandle,
    CompressionType, Footer, BLOCK_TRAILER_LEN, FOOTER_LEN, MAX_BLOCK_HANDLE_LEN, TABLE_MAGIC,
};
pub use key::{Key, KeyBuffer, ValueType, MAX_KEY_BYTES, MAX_SEQUENCE};
pub use reader::{BlockCache, EntryCursor, FileIter, TableFile};

#[cfg(any(test, feature = "test-util"))]
pub use writer::{BlockBuilder, TableBuilder};

use coding::CodingError;
use std::io;
use thiserror::Error;

/// Errors raised while reading table files.
#[derive(Debug, Error)]
pub enum TableError {
    /// An underlying I/O error, propagated unchanged.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A primitive decode failed (truncated buffer, malformed varint).
    #[error(transparent)]
    Coding(#[from] CodingError),

    /// The footer magic did not match [`TABLE_MAGIC`].
    #[error("not a valid table file (bad magic {magic:#018x})")]
    NotATable { magic: u64 },

    /// The file is shorter than a footer.
    #[error("not a valid table file ({size} bytes is smaller than the footer)")]
    FileTooSmall { size: u64 },

    /// A block is too short for its restart array, or the array points
    /// outside the block.
    #[error("bad block contents")]
    BadBlockContents,

    /// An entry's shared prefix exceeds the previous key, or its lengths
    /// run past the block.
    #[error("bad entry in block")]
    BadEntry,

    /// A reconstructed key outgrew the key buffer.
    #[error("key of {len} bytes exceeds the {max}-byte key buffer", max = MAX_KEY_BYTES)]
    KeyTooLong { len: usize },

    /// An internal key is shorter than its trailer or has an unknown type.
    #[error("bad internal key")]
    BadInternalKey,

    /// A block trailer named an unknown compression type.
    #[error("bad block type {0}")]
    BadBlockType(u8),

    /// A block handle points past the end of its file.
    #[error("block handle ({offset}, {size}) out of bounds for {file_len}-byte file")]
    BlockOutOfBounds { offset: u64, size: u64, file_len: u64 },

    /// The decompressor rejected a block.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// A block was requested from a table file that is not open.
    #[error("table file {number:06} is not open")]
    NotOpen { number: u64 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;
