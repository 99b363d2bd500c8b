//! Table format constants, block handles, the footer, and raw block reads.
//!
//! ## Footer (48 bytes)
//!
//! ```text
//! [meta_index_handle: varint64 x2][index_handle: varint64 x2][zero padding]
//! [magic lo: u32 LE][magic hi: u32 LE]
//! ```
//!
//! The two handles take at most 40 bytes together and are padded to that
//! width, so the magic always sits in the last 8 bytes of the file.
//!
//! ## Block trailer (5 bytes)
//!
//! ```text
//! [compression: u8][checksum: u32 LE]
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use coding::{decode_fixed32, decode_varint64, ByteView};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use tracing::trace;

use crate::{Block, Decompressor, Result, TableError};

/// Magic number closing every table file.
pub const TABLE_MAGIC: u64 = 0xdb47_7524_8b80_fb57;

/// Longest encoding of a [`BlockHandle`]: two varint64s.
pub const MAX_BLOCK_HANDLE_LEN: usize = 10 + 10;

/// Size of the footer in bytes: two padded handles + 8-byte magic.
pub const FOOTER_LEN: usize = 2 * MAX_BLOCK_HANDLE_LEN + 8;

/// Bytes following every block on disk: compression type + checksum.
pub const BLOCK_TRAILER_LEN: usize = 1 + 4;

/// Returns the on-disk name of table file `number`, e.g. `000042.ldb`.
#[must_use]
pub fn table_file_name(number: u64) -> String {
    format!("{:06}.ldb", number)
}

/// Locates a block within a table file.
///
/// Ordered by offset, then size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    #[must_use]
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Reads two varint64s (offset, size) from the front of `view`.
    pub fn decode(view: &mut ByteView<'_>) -> Result<Self> {
        let offset = decode_varint64(view)?;
        let size = decode_varint64(view)?;
        Ok(Self { offset, size })
    }

    /// Decodes a handle stored as an index block value.
    pub fn decode_from(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut ByteView::new(bytes))
    }

    /// Appends the varint encoding of this handle to `dst`.
    #[cfg(any(test, feature = "test-util"))]
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        coding::encode::put_varint64(dst, self.offset);
        coding::encode::put_varint64(dst, self.size);
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.offset, self.size)
    }
}

/// The fixed-size trailer anchoring a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Handle of the meta-index block (filters, stats). Not used for reads.
    pub meta_index_handle: BlockHandle,
    /// Handle of the index block.
    pub index_handle: BlockHandle,
}

impl Footer {
    /// Decodes a footer from the first [`FOOTER_LEN`] bytes of `view` and
    /// advances the view past them.
    ///
    /// # Errors
    ///
    /// - Magic mismatch -> [`TableError::NotATable`].
    /// - Fewer than [`FOOTER_LEN`] bytes -> [`TableError::Coding`].
    pub fn decode(view: &mut ByteView<'_>) -> Result<Self> {
        let region = view.sub(0, FOOTER_LEN)?;

        let lo = decode_fixed32(&mut region.sub(FOOTER_LEN - 8, 4)?)?;
        let hi = decode_fixed32(&mut region.sub(FOOTER_LEN - 4, 4)?)?;
        let magic = (u64::from(hi) << 32) | u64::from(lo);
        if magic != TABLE_MAGIC {
            return Err(TableError::NotATable { magic });
        }

        let mut handles = region;
        let meta_index_handle = BlockHandle::decode(&mut handles)?;
        let index_handle = BlockHandle::decode(&mut handles)?;

        view.advance(FOOTER_LEN)?;
        Ok(Self {
            meta_index_handle,
            index_handle,
        })
    }

    /// Encodes the footer into its fixed 48-byte form.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FOOTER_LEN);
        self.meta_index_handle.encode_to(&mut out);
        self.index_handle.encode_to(&mut out);
        out.resize(2 * MAX_BLOCK_HANDLE_LEN, 0);
        coding::encode::put_fixed32(&mut out, TABLE_MAGIC as u32);
        coding::encode::put_fixed32(&mut out, (TABLE_MAGIC >> 32) as u32);
        out
    }
}

/// Compression applied to a block's contents, from the block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    Snappy = 1,
}

impl CompressionType {
    /// Maps a trailer byte to a compression type.
    ///
    /// Returns [`TableError::BadBlockType`] for anything but `0` or `1`.
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Snappy),
            other => Err(TableError::BadBlockType(other)),
        }
    }
}

/// Reads the footer from the last [`FOOTER_LEN`] bytes of `r`.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> Result<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < FOOTER_LEN as u64 {
        return Err(TableError::FileTooSmall { size: filesize });
    }

    r.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
    let mut buf = [0u8; FOOTER_LEN];
    r.read_exact(&mut buf)?;
    Footer::decode(&mut ByteView::new(&buf))
}

/// Reads the contents of the block at `handle`, undoing compression.
///
/// Reads `size + 1` bytes (contents plus compression type) followed by the
/// 4-byte checksum, which is skipped. Compressed contents go through
/// `decompressor`.
pub fn read_block_contents<R: Read + Seek>(
    r: &mut R,
    handle: BlockHandle,
    decompressor: &dyn Decompressor,
) -> Result<Vec<u8>> {
    let n = usize::try_from(handle.size).map_err(|_| TableError::BadBlockContents)?;

    r.seek(SeekFrom::Start(handle.offset))?;
    let mut buf = vec![0u8; n + 1];
    r.read_exact(&mut buf)?;
    let compression = CompressionType::from_u8(buf[n])?;
    let _checksum = r.read_u32::<LittleEndian>()?;

    trace!(offset = handle.offset, size = handle.size, ?compression, "read block");

    match compression {
        CompressionType::None => {
            buf.truncate(n);
            Ok(buf)
        }
        CompressionType::Snappy => decompressor.decompress(&buf, 0, n),
    }
}

/// Reads and decodes the data block at `handle`.
pub fn read_block<R: Read + Seek>(
    r: &mut R,
    handle: BlockHandle,
    decompressor: &dyn Decompressor,
) -> Result<Block> {
    Block::decode(&read_block_contents(r, handle, decompressor)?)
}

/// Reads and decodes the index block at `handle`.
pub fn read_index_block<R: Read + Seek>(
    r: &mut R,
    handle: BlockHandle,
    decompressor: &dyn Decompressor,
) -> Result<Block> {
    Block::decode_index(&read_block_contents(r, handle, decompressor)?)
}
